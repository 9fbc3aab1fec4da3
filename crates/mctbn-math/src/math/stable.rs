//! Numerically stable primitives for log-domain likelihood math.

use std::f64::consts::PI;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // These are published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// `ln Σ exp(v)` without overflow.
///
/// Empty input and all-`-inf` input give `-inf`; any NaN gives NaN.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// `ln |Γ(z)|`, Lanczos (g = 7) with the reflection formula below 1/2.
///
/// NaN at the poles (zero and the negative integers) and at `-inf`.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() || z == f64::NEG_INFINITY || (z <= 0.0 && z.fract() == 0.0) {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z < 0.5 {
        // Γ(z)·Γ(1−z) = π / sin(πz)
        let sin_pi = (PI * z).sin().abs();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.ln() - log_gamma(1.0 - z);
    }

    let w = z - 1.0;
    let series = LANCZOS_COEFFS[0]
        + LANCZOS_COEFFS[1..]
            .iter()
            .zip(1..)
            .map(|(c, k)| c / (w + k as f64))
            .sum::<f64>();
    let t = w + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (w + 0.5) * t.ln() - t + series.ln()
}

/// log Beta(a, b) = log Gamma(a) + log Gamma(b) - log Gamma(a+b).
pub fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

/// Normalize a vector of log-weights into probabilities.
///
/// Subtracts the log-sum-exp before exponentiating so that very negative
/// log-weights do not underflow to an all-zero vector. Returns `None` when
/// every weight is `-inf` (nothing to normalize) or any weight is NaN.
pub fn normalize_log_probs(log_weights: &[f64]) -> Option<Vec<f64>> {
    let total = log_sum_exp(log_weights);
    if total.is_nan() || total == f64::NEG_INFINITY || total == f64::INFINITY {
        return None;
    }
    Some(log_weights.iter().map(|w| (w - total).exp()).collect())
}

/// `ln(x)` that maps non-positive inputs to `-inf` instead of NaN.
pub fn ln_or_neg_inf(x: f64) -> f64 {
    if x > 0.0 {
        x.ln()
    } else {
        f64::NEG_INFINITY
    }
}
