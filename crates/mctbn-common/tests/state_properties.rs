//! Property tests for the `State` assignment type.

use mctbn_common::State;
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn hash_of(state: &State) -> u64 {
    let mut h = DefaultHasher::new();
    state.hash(&mut h);
    h.finish()
}

fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(("[a-e]", "[0-3]"), 0..8)
}

proptest! {
    /// Equal states hash equally regardless of construction order.
    #[test]
    fn permutation_invariant(mut entries in pairs()) {
        // Dedupe so that "last value wins" does not depend on order.
        entries.sort();
        entries.dedup_by(|a, b| a.0 == b.0);
        let forward = State::new(entries.clone());
        entries.reverse();
        let backward = State::new(entries);
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(hash_of(&forward), hash_of(&backward));
    }

    /// A state always satisfies any of its projections.
    #[test]
    fn satisfies_own_projection(entries in pairs(), keep in proptest::collection::vec("[a-e]", 0..5)) {
        let state = State::new(entries);
        let projected = state.project(&keep);
        prop_assert!(projected.len() <= state.len());
        prop_assert!(state.satisfies(&projected));
    }

    /// JSON serialization preserves equality.
    #[test]
    fn json_preserves_equality(entries in pairs()) {
        let state = State::new(entries);
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(hash_of(&back), hash_of(&state));
        prop_assert_eq!(back, state);
    }
}
