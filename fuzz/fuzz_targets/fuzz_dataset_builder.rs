//! Fuzz target for dataset construction.
//!
//! Feeds arbitrary rows to the dataset builder. Malformed sequences must be
//! rejected one by one; building and querying the result must never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mctbn_core::{DatasetBuilder, State};

#[derive(Debug, Arbitrary)]
struct Input {
    header: Vec<String>,
    class_columns: Vec<u8>,
    sequences: Vec<Vec<Vec<String>>>,
}

fuzz_target!(|input: Input| {
    let Some(time) = input.header.first().cloned() else {
        return;
    };
    let classes: Vec<&str> = input
        .class_columns
        .iter()
        .filter_map(|&i| input.header.get(i as usize))
        .map(String::as_str)
        .collect();
    let Ok(mut builder) = DatasetBuilder::new(input.header.clone(), &time, &classes) else {
        return;
    };
    for rows in input.sequences {
        let _ = builder.add_sequence(rows);
    }
    if let Ok(dataset) = builder.build() {
        for i in 0..dataset.num_sequences() {
            if let Some(assignment) = dataset.class_assignment(i) {
                let _ = dataset.count_matching(&assignment);
            }
        }
        let _ = dataset.count_matching(&State::new([("", "")]));
    }
});
