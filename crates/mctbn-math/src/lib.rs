//! Numerical primitives for continuous-time Bayesian network learning.

pub mod math;

pub use math::beta::{beta_cdf, f_cdf, f_two_sided_p_value};
pub use math::dirichlet;
pub use math::gamma::{chi_square_cdf, chi_square_sf, gamma_p, gamma_q};
pub use math::hypothesis;
pub use math::stable::*;
