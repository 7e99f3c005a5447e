//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model selection (`ModelName`, `SpfModel`, `SeriesBasis`, `UvOrder`)
//! - immutable run inputs (`FitConfig`, `RunConfig`, `CorrelatorData`)
//! - fit outputs (`FitResult`, `AggregateResult`, `SampleFailure`)

pub mod types;

pub use types::*;
