//! Spectral-function model catalogue.
//!
//! Models are implemented as small, pure functions of `(ω/T, config, params)` so that
//! the transform and the fitter can stay generic.

pub mod model;

pub use model::*;
