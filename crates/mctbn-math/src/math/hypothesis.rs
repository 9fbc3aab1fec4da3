//! Conditional-independence hypothesis tests used by constraint-based search.
//!
//! Three tests are provided:
//! - [`time_to_transition_test`]: two-sided F test that a variable leaves a
//!   state at the same rate with and without a candidate parent.
//! - [`transition_distribution_test`]: two-sample chi-square homogeneity test
//!   that the destination distribution out of a state is the same with and
//!   without a candidate parent.
//! - [`contingency_test`]: Pearson chi-square independence over a stack of
//!   contingency tables (one per separating-set configuration).
//!
//! # Significance convention
//!
//! A significance level of 1 always rejects the null (independence) and a
//! level of 0 never rejects it. Between those, the null is rejected when the
//! p-value falls below the level.

use super::beta::f_two_sided_p_value;
use super::gamma::chi_square_sf;
use serde::{Deserialize, Serialize};

/// Outcome of a single hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TestOutcome {
    /// The null hypothesis (independence) is kept.
    Accepted { p_value: f64 },
    /// The null hypothesis is rejected: evidence of dependence.
    Rejected { p_value: f64 },
    /// Not enough data to run the test; treated as no evidence of dependence.
    Untestable,
}

impl TestOutcome {
    /// True when the test found evidence of dependence.
    pub fn is_rejected(&self) -> bool {
        matches!(self, TestOutcome::Rejected { .. })
    }

    fn from_p_value(p_value: f64, significance: f64) -> Self {
        if rejects_null(p_value, significance) {
            TestOutcome::Rejected { p_value }
        } else {
            TestOutcome::Accepted { p_value }
        }
    }
}

/// Decide whether a p-value rejects the null at the given significance level.
pub fn rejects_null(p_value: f64, significance: f64) -> bool {
    if significance >= 1.0 {
        return true;
    }
    if significance <= 0.0 || p_value.is_nan() {
        return false;
    }
    p_value < significance
}

/// F test on leaving rates.
///
/// `m_with`/`t_with` are the leave count and sojourn time of one state under the
/// larger conditioning set (candidate parent included), `m_without`/`t_without`
/// the same quantities with the candidate parent marginalized out. Under the
/// null `q_with / q_without ~ F(2·m_without, 2·m_with)`.
pub fn time_to_transition_test(
    m_with: f64,
    t_with: f64,
    m_without: f64,
    t_without: f64,
    significance: f64,
) -> TestOutcome {
    if significance >= 1.0 {
        return TestOutcome::Rejected { p_value: 0.0 };
    }
    if significance <= 0.0 {
        return TestOutcome::Accepted { p_value: 1.0 };
    }
    if m_with <= 0.0 || m_without <= 0.0 || t_with <= 0.0 || t_without <= 0.0 {
        return TestOutcome::Untestable;
    }
    let rate_with = m_with / t_with;
    let rate_without = m_without / t_without;
    let p_value = f_two_sided_p_value(rate_with / rate_without, 2.0 * m_without, 2.0 * m_with);
    TestOutcome::from_p_value(p_value, significance)
}

/// Two-sample chi-square test on destination counts.
///
/// Both slices hold the counts of transitions out of one state towards every
/// destination. Destinations without counts in either sample are ignored.
pub fn transition_distribution_test(
    counts_with: &[f64],
    counts_without: &[f64],
    significance: f64,
) -> TestOutcome {
    if significance >= 1.0 {
        return TestOutcome::Rejected { p_value: 0.0 };
    }
    if significance <= 0.0 {
        return TestOutcome::Accepted { p_value: 1.0 };
    }
    if counts_with.len() != counts_without.len() {
        return TestOutcome::Untestable;
    }
    let n_with: f64 = counts_with.iter().sum();
    let n_without: f64 = counts_without.iter().sum();
    if n_with <= 0.0 || n_without <= 0.0 {
        return TestOutcome::Untestable;
    }

    let k = (n_without / n_with).sqrt();
    let l = 1.0 / k;
    let mut statistic = 0.0;
    let mut categories = 0usize;
    for (&c1, &c2) in counts_with.iter().zip(counts_without.iter()) {
        let total = c1 + c2;
        if total <= 0.0 {
            continue;
        }
        categories += 1;
        let diff = k * c1 - l * c2;
        statistic += diff * diff / total;
    }
    if categories < 2 {
        return TestOutcome::Untestable;
    }
    let p_value = chi_square_sf(statistic, (categories - 1) as f64);
    TestOutcome::from_p_value(p_value, significance)
}

/// Pearson chi-square independence test over stacked contingency tables.
///
/// `tables[s][i][j]` is the count of `X = i, Y = j` under separating-set
/// configuration `s`. Statistics and degrees of freedom are summed across
/// configurations; empty rows and columns do not contribute degrees of freedom.
pub fn contingency_test(tables: &[Vec<Vec<f64>>], significance: f64) -> TestOutcome {
    if significance >= 1.0 {
        return TestOutcome::Rejected { p_value: 0.0 };
    }
    if significance <= 0.0 {
        return TestOutcome::Accepted { p_value: 1.0 };
    }

    let mut statistic = 0.0;
    let mut dof = 0usize;
    for table in tables {
        let rows: Vec<f64> = table.iter().map(|row| row.iter().sum()).collect();
        let n_cols = table.first().map(|row| row.len()).unwrap_or(0);
        let cols: Vec<f64> = (0..n_cols)
            .map(|j| table.iter().map(|row| row[j]).sum())
            .collect();
        let total: f64 = rows.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let live_rows = rows.iter().filter(|r| **r > 0.0).count();
        let live_cols = cols.iter().filter(|c| **c > 0.0).count();
        if live_rows < 2 || live_cols < 2 {
            continue;
        }
        dof += (live_rows - 1) * (live_cols - 1);
        for (i, row) in table.iter().enumerate() {
            for (j, &observed) in row.iter().enumerate() {
                let expected = rows[i] * cols[j] / total;
                if expected > 0.0 {
                    let diff = observed - expected;
                    statistic += diff * diff / expected;
                }
            }
        }
    }
    if dof == 0 {
        return TestOutcome::Untestable;
    }
    let p_value = chi_square_sf(statistic, dof as f64);
    TestOutcome::from_p_value(p_value, significance)
}
