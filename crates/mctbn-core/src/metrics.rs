//! Evaluation metrics for multidimensional predictions.
//!
//! Provides, against the labels recorded in a dataset:
//! - Global accuracy (every class variable right)
//! - Per-variable accuracy and its mean
//! - Macro-averaged F1 per class variable
//! - Brier score over the joint posterior

use crate::classify::Prediction;
use crate::dataset::Dataset;
use crate::logging::{event_names, LogContext, Stage};
use mctbn_common::{Error, Result, State};
use serde::{Deserialize, Serialize};

/// Metrics of one class variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMetrics {
    pub variable: String,
    pub accuracy: f64,
    /// Mean F1 over the values that occur in the labels or the predictions.
    pub macro_f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Predictions with a known label.
    pub sample_count: usize,
    /// Fraction of sequences with every class variable right.
    pub global_accuracy: f64,
    /// Mean of the per-variable accuracies.
    pub mean_accuracy: f64,
    pub per_variable: Vec<VariableMetrics>,
    /// Mean squared error of the joint posterior; `None` unless every
    /// prediction carries its posterior.
    pub brier_score: Option<f64>,
}

/// Compare predictions with the labels of `dataset`.
///
/// Predictions for sequences without a usable label are ignored.
pub fn evaluate(predictions: &[Prediction], dataset: &Dataset) -> Result<EvaluationReport> {
    evaluate_with_context(predictions, dataset, &LogContext::fresh())
}

pub fn evaluate_with_context(
    predictions: &[Prediction],
    dataset: &Dataset,
    context: &LogContext,
) -> Result<EvaluationReport> {
    let labeled: Vec<(&Prediction, State)> = predictions
        .iter()
        .filter_map(|p| dataset.class_assignment(p.sequence).map(|truth| (p, truth)))
        .collect();
    if labeled.is_empty() {
        return Err(Error::Data("no prediction has a known label".to_string()));
    }
    let n = labeled.len() as f64;

    let names: Vec<&str> = dataset.class_variables().iter().map(|v| v.name.as_str()).collect();
    let global_hits = labeled
        .iter()
        .filter(|(p, truth)| p.class_configuration.project(&names[..]) == *truth)
        .count();

    let per_variable: Vec<VariableMetrics> = dataset
        .class_variables()
        .iter()
        .map(|variable| {
            let pairs: Vec<(Option<&str>, Option<&str>)> = labeled
                .iter()
                .map(|(p, truth)| {
                    (
                        p.class_configuration.get(&variable.name),
                        truth.get(&variable.name),
                    )
                })
                .collect();
            let hits = pairs.iter().filter(|(p, t)| p.is_some() && p == t).count();
            VariableMetrics {
                variable: variable.name.clone(),
                accuracy: hits as f64 / n,
                macro_f1: macro_f1(&pairs, &variable.domain),
            }
        })
        .collect();
    let mean_accuracy =
        per_variable.iter().map(|m| m.accuracy).sum::<f64>() / per_variable.len().max(1) as f64;

    let brier_score = labeled
        .iter()
        .map(|(p, truth)| {
            p.posterior.as_ref().map(|posterior| {
                posterior
                    .iter()
                    .map(|(state, q)| {
                        let target = if state == truth { 1.0 } else { 0.0 };
                        (q - target).powi(2)
                    })
                    .sum::<f64>()
            })
        })
        .sum::<Option<f64>>()
        .map(|total| total / n);

    let report = EvaluationReport {
        sample_count: labeled.len(),
        global_accuracy: global_hits as f64 / n,
        mean_accuracy,
        per_variable,
        brier_score,
    };
    crate::log_event!(
        context,
        INFO,
        event_names::EVALUATE_FINISHED,
        Stage::Evaluate,
        "evaluation finished",
        samples = report.sample_count,
        global_accuracy = report.global_accuracy,
        mean_accuracy = report.mean_accuracy
    );
    Ok(report)
}

fn macro_f1(pairs: &[(Option<&str>, Option<&str>)], domain: &[String]) -> f64 {
    let mut total = 0.0;
    let mut counted = 0usize;
    for value in domain {
        let value = Some(value.as_str());
        let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
        for &(predicted, actual) in pairs {
            match (predicted == value, actual == value) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => {}
            }
        }
        if tp + fp + fn_ == 0 {
            continue;
        }
        total += 2.0 * tp as f64 / (2 * tp + fp + fn_) as f64;
        counted += 1;
    }
    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetBuilder;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// Four sequences labeled (A, B) = (x,p), (x,q), (y,p), (y,q).
    fn dataset() -> Dataset {
        let mut b = DatasetBuilder::new(strings(&["t", "A", "B", "F"]), "t", &["A", "B"]).unwrap();
        for (a, bv) in [("x", "p"), ("x", "q"), ("y", "p"), ("y", "q")] {
            b.add_sequence(vec![strings(&["0", a, bv, "f"]), strings(&["1", a, bv, "g"])])
                .unwrap();
        }
        b.build().unwrap()
    }

    fn prediction(sequence: usize, a: &str, b: &str, posterior: Option<Vec<(State, f64)>>) -> Prediction {
        Prediction {
            sequence,
            class_configuration: State::new([("A", a), ("B", b)]),
            probability: 1.0,
            posterior,
            fallback: false,
        }
    }

    #[test]
    fn test_accuracies() {
        let data = dataset();
        let predictions = vec![
            prediction(0, "x", "p", None),
            prediction(1, "x", "p", None),
            prediction(2, "y", "p", None),
            prediction(3, "x", "q", None),
        ];
        let report = evaluate(&predictions, &data).unwrap();
        assert_eq!(report.sample_count, 4);
        assert!(approx_eq(report.global_accuracy, 0.5, 1e-12));
        assert!(approx_eq(report.per_variable[0].accuracy, 0.75, 1e-12));
        assert!(approx_eq(report.per_variable[1].accuracy, 0.75, 1e-12));
        assert!(approx_eq(report.mean_accuracy, 0.75, 1e-12));
        assert!(report.brier_score.is_none());
    }

    #[test]
    fn test_macro_f1() {
        // A: predicted x,x,y,x vs truth x,x,y,y
        // x: tp 2, fp 1, fn 0 -> 0.8; y: tp 1, fp 0, fn 1 -> 2/3
        let data = dataset();
        let predictions = vec![
            prediction(0, "x", "p", None),
            prediction(1, "x", "q", None),
            prediction(2, "y", "p", None),
            prediction(3, "x", "q", None),
        ];
        let report = evaluate(&predictions, &data).unwrap();
        assert!(approx_eq(report.per_variable[0].macro_f1, (0.8 + 2.0 / 3.0) / 2.0, 1e-12));
        assert!(approx_eq(report.per_variable[1].macro_f1, 1.0, 1e-12));
    }

    #[test]
    fn test_brier_score() {
        let data = dataset();
        let truth = State::new([("A", "x"), ("B", "p")]);
        let other = State::new([("A", "y"), ("B", "p")]);
        let posterior = vec![(truth, 0.75), (other, 0.25)];
        let predictions = vec![prediction(0, "x", "p", Some(posterior))];
        let report = evaluate(&predictions, &data).unwrap();
        let expected = 0.25f64.powi(2) + 0.25f64.powi(2);
        assert!(approx_eq(report.brier_score.unwrap(), expected, 1e-12));
    }

    #[test]
    fn test_no_labels_is_an_error() {
        let data = dataset();
        let predictions = vec![prediction(10, "x", "p", None)];
        assert!(evaluate(&predictions, &data).is_err());
    }
}
