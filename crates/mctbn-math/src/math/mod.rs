//! Core math modules.

pub mod beta;
pub mod dirichlet;
pub mod gamma;
pub mod hypothesis;
pub mod stable;
