//! Dirichlet-multinomial evidence for Bayesian-Dirichlet structure scores.
//!
//! For one row of a conditional table with prior `Dirichlet(α_1..α_K)` and
//! observed counts `n_1..n_K`, the marginal likelihood of the ordered sequence
//! of observations is
//!
//! `P(n | α) = B(α + n) / B(α)`
//!
//! with `B` the multivariate beta function. Unlike a multinomial marginal there
//! is no `N! / Π n_i!` coefficient: structure scores compare likelihoods of the
//! same ordered data under different parent sets.

use super::stable::log_gamma;
use serde::{Deserialize, Serialize};

/// Parameters for a Dirichlet prior over one table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletParams {
    /// Concentration parameters (all must be > 0)
    pub alpha: Vec<f64>,
}

impl DirichletParams {
    /// Create new Dirichlet parameters with validation.
    ///
    /// Returns None if any parameter is non-positive, NaN, or if the vector is empty.
    pub fn new(alpha: Vec<f64>) -> Option<Self> {
        if alpha.is_empty() {
            return None;
        }
        if alpha.iter().any(|a| a.is_nan() || *a <= 0.0) {
            return None;
        }
        Some(Self { alpha })
    }

    /// Create a symmetric Dirichlet with all α_i = value.
    pub fn symmetric(k: usize, value: f64) -> Option<Self> {
        if k == 0 || value.is_nan() || value <= 0.0 {
            return None;
        }
        Some(Self {
            alpha: vec![value; k],
        })
    }

    /// Number of categories K.
    pub fn k(&self) -> usize {
        self.alpha.len()
    }

    /// Sum of all concentration parameters: α_0 = Σ_i α_i.
    pub fn concentration(&self) -> f64 {
        self.alpha.iter().sum()
    }
}

/// Compute log of the multivariate beta function.
///
/// log B(α) = Σ_i lgamma(α_i) - lgamma(Σ_i α_i)
pub fn log_multivariate_beta(alpha: &[f64]) -> f64 {
    if alpha.is_empty() {
        return f64::NAN;
    }
    if alpha.iter().any(|a| a.is_nan() || *a <= 0.0) {
        return f64::NAN;
    }

    let sum: f64 = alpha.iter().sum();
    let log_sum_gamma: f64 = alpha.iter().map(|&a| log_gamma(a)).sum();

    log_sum_gamma - log_gamma(sum)
}

/// Log evidence of `counts` under a Dirichlet prior: `log B(α + n) - log B(α)`.
///
/// Returns NAN when the lengths differ or any count is negative or NaN.
/// A single category carries no information and yields 0.
pub fn log_dirichlet_evidence(prior: &DirichletParams, counts: &[f64]) -> f64 {
    if counts.len() != prior.k() {
        return f64::NAN;
    }
    if counts.iter().any(|c| c.is_nan() || *c < 0.0) {
        return f64::NAN;
    }
    if prior.k() == 1 {
        return 0.0;
    }

    let post_alpha: Vec<f64> = prior
        .alpha
        .iter()
        .zip(counts.iter())
        .map(|(&a, &n)| a + n)
        .collect();

    log_multivariate_beta(&post_alpha) - log_multivariate_beta(&prior.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn params_validation() {
        assert!(DirichletParams::new(vec![]).is_none());
        assert!(DirichletParams::new(vec![1.0, 0.0]).is_none());
        assert!(DirichletParams::new(vec![1.0, f64::NAN]).is_none());
        assert!(DirichletParams::symmetric(0, 1.0).is_none());
        let p = DirichletParams::symmetric(3, 0.5).unwrap();
        assert_eq!(p.k(), 3);
        assert!(approx_eq(p.concentration(), 1.5, 1e-12));
    }

    #[test]
    fn multivariate_beta_reduces_to_beta() {
        // B(2, 3) = 1/12
        let lb = log_multivariate_beta(&[2.0, 3.0]);
        assert!(approx_eq(lb, (1.0f64 / 12.0).ln(), 1e-10));
    }

    #[test]
    fn evidence_of_no_data_is_zero() {
        let prior = DirichletParams::symmetric(4, 0.25).unwrap();
        let ev = log_dirichlet_evidence(&prior, &[0.0, 0.0, 0.0, 0.0]);
        assert!(approx_eq(ev, 0.0, 1e-12));
    }

    #[test]
    fn evidence_matches_sequential_predictive() {
        // Uniform Beta(1,1) prior, sequence a, a, b:
        // P = 1/2 * 2/3 * 1/4 = 1/12
        let prior = DirichletParams::symmetric(2, 1.0).unwrap();
        let ev = log_dirichlet_evidence(&prior, &[2.0, 1.0]);
        assert!(approx_eq(ev, (1.0f64 / 12.0).ln(), 1e-10));
    }

    #[test]
    fn evidence_rejects_bad_counts() {
        let prior = DirichletParams::symmetric(2, 1.0).unwrap();
        assert!(log_dirichlet_evidence(&prior, &[1.0]).is_nan());
        assert!(log_dirichlet_evidence(&prior, &[1.0, -1.0]).is_nan());
    }

    #[test]
    fn single_category_is_uninformative() {
        let prior = DirichletParams::symmetric(1, 2.0).unwrap();
        assert_eq!(log_dirichlet_evidence(&prior, &[17.0]), 0.0);
    }
}
