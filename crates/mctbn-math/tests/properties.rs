//! Property-based tests for the distribution functions behind the
//! independence tests.

use mctbn_math::dirichlet::{log_dirichlet_evidence, DirichletParams};
use mctbn_math::hypothesis::{
    contingency_test, rejects_null, time_to_transition_test, transition_distribution_test,
    TestOutcome,
};
use mctbn_math::{
    chi_square_cdf, chi_square_sf, f_cdf, f_two_sided_p_value, gamma_p, gamma_q, log_sum_exp,
    normalize_log_probs,
};
use proptest::prelude::*;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn in_unit_interval(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

fn p_value(outcome: TestOutcome) -> Option<f64> {
    match outcome {
        TestOutcome::Accepted { p_value } | TestOutcome::Rejected { p_value } => Some(p_value),
        TestOutcome::Untestable => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn gamma_p_and_q_are_complementary(a in 0.05f64..80.0, x in 0.0f64..250.0) {
        let p = gamma_p(a, x);
        let q = gamma_q(a, x);
        prop_assert!(in_unit_interval(p), "P({a}, {x}) = {p}");
        prop_assert!(in_unit_interval(q), "Q({a}, {x}) = {q}");
        prop_assert!(approx_eq(p + q, 1.0, 1e-10), "P + Q = {}", p + q);
    }

    #[test]
    fn chi_square_tail_never_increases(
        dof in 1u32..60,
        x in 0.0f64..150.0,
        step in 0.0f64..20.0,
    ) {
        let dof = dof as f64;
        let near = chi_square_sf(x, dof);
        let far = chi_square_sf(x + step, dof);
        prop_assert!(in_unit_interval(near) && in_unit_interval(far));
        prop_assert!(far <= near + 1e-12, "sf({}) = {far} > sf({x}) = {near}", x + step);
        prop_assert!(approx_eq(near + chi_square_cdf(x, dof), 1.0, 1e-10));
    }

    #[test]
    fn f_p_value_is_a_probability(ratio in 0.0f64..50.0, d1 in 1.0f64..400.0, d2 in 1.0f64..400.0) {
        let p = f_two_sided_p_value(ratio, d1, d2);
        prop_assert!(in_unit_interval(p), "p({ratio}; {d1}, {d2}) = {p}");
    }

    /// If `X ~ F(d1, d2)` then `1/X ~ F(d2, d1)`: swapping which rate is on
    /// top of the ratio cannot change a two-sided test.
    #[test]
    fn f_p_value_is_symmetric_under_inversion(
        ratio in 0.02f64..50.0,
        d1 in 2.0f64..200.0,
        d2 in 2.0f64..200.0,
    ) {
        let forward = f_two_sided_p_value(ratio, d1, d2);
        let inverted = f_two_sided_p_value(1.0 / ratio, d2, d1);
        prop_assert!(approx_eq(forward, inverted, 1e-8), "{forward} vs {inverted}");
        prop_assert!(approx_eq(f_cdf(ratio, d1, d2), 1.0 - f_cdf(1.0 / ratio, d2, d1), 1e-8));
    }

    #[test]
    fn full_significance_always_rejects(p in prop::num::f64::ANY, alpha in 1.0f64..10.0) {
        prop_assert!(rejects_null(p, alpha));
    }

    #[test]
    fn zero_significance_never_rejects(p in prop::num::f64::ANY, alpha in -10.0f64..=0.0) {
        prop_assert!(!rejects_null(p, alpha));
    }

    #[test]
    fn rejection_grows_with_significance(p in 0.0f64..=1.0, lo in 0.0f64..1.0, hi in 0.0f64..1.0) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        if rejects_null(p, lo) {
            prop_assert!(rejects_null(p, hi));
        }
    }

    #[test]
    fn independence_tests_follow_the_significance_extremes(
        m_with in 0.0f64..50.0,
        t_with in 0.0f64..50.0,
        m_without in 0.0f64..50.0,
        t_without in 0.0f64..50.0,
        counts in prop::collection::vec((0.0f64..30.0, 0.0f64..30.0), 1..6),
    ) {
        let (with, without): (Vec<f64>, Vec<f64>) = counts.iter().copied().unzip();
        let table = vec![with.clone(), without.clone()];

        prop_assert!(time_to_transition_test(m_with, t_with, m_without, t_without, 1.0).is_rejected());
        prop_assert!(transition_distribution_test(&with, &without, 1.0).is_rejected());
        prop_assert!(contingency_test(&[table.clone()], 1.0).is_rejected());

        prop_assert!(!time_to_transition_test(m_with, t_with, m_without, t_without, 0.0).is_rejected());
        prop_assert!(!transition_distribution_test(&with, &without, 0.0).is_rejected());
        prop_assert!(!contingency_test(&[table], 0.0).is_rejected());
    }

    #[test]
    fn independence_test_p_values_are_probabilities(
        counts in prop::collection::vec((0.0f64..30.0, 0.0f64..30.0), 2..6),
        m in 1.0f64..40.0,
        t in 0.1f64..40.0,
        alpha in 0.001f64..0.999,
    ) {
        let (with, without): (Vec<f64>, Vec<f64>) = counts.iter().copied().unzip();
        for outcome in [
            transition_distribution_test(&with, &without, alpha),
            contingency_test(&[vec![with.clone(), without.clone()]], alpha),
            time_to_transition_test(m, t, m + 1.0, t * 0.5, alpha),
        ] {
            if let Some(p) = p_value(outcome) {
                prop_assert!(in_unit_interval(p), "{outcome:?}");
                prop_assert_eq!(outcome.is_rejected(), p < alpha);
            }
        }
    }

    #[test]
    fn normalized_posteriors_sum_to_one(
        weights in prop::collection::vec(-2_000.0f64..0.0, 1..12),
    ) {
        let probs = normalize_log_probs(&weights).unwrap();
        prop_assert!(approx_eq(probs.iter().sum::<f64>(), 1.0, 1e-9));
        prop_assert!(log_sum_exp(&weights) >= weights.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    }

    /// More observations of the same proportions can only make the evidence
    /// smaller, since each count multiplies in a probability below one.
    #[test]
    fn dirichlet_evidence_decreases_with_data(
        alpha in 0.1f64..5.0,
        counts in prop::collection::vec(0u32..20, 2..5),
    ) {
        let prior = DirichletParams::symmetric(counts.len(), alpha).unwrap();
        let small: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        let large: Vec<f64> = small.iter().map(|c| c + 1.0).collect();
        let evidence_small = log_dirichlet_evidence(&prior, &small);
        let evidence_large = log_dirichlet_evidence(&prior, &large);
        prop_assert!(evidence_small <= 1e-12);
        prop_assert!(evidence_large < evidence_small + 1e-12);
    }
}
