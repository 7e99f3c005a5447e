//! SPF fitting pipeline.
//!
//! Responsibilities:
//!
//! - predict correlators from model parameters (`transform`)
//! - score a parameter point against one sample (`objective`)
//! - fit one sample and evaluate the result (`fitter`)
//! - fan out over the ensemble and aggregate (`resample`, `record`)

pub mod fitter;
pub mod objective;
pub mod record;
pub mod resample;
pub mod transform;

pub use fitter::*;
pub use objective::*;
pub use record::*;
pub use resample::*;
pub use transform::*;
