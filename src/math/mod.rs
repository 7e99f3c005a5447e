//! Numerical building blocks: transform kernel, series basis, interpolation,
//! quadrature, bounded minimization and ensemble statistics.

pub mod basis;
pub mod kernel;
pub mod minimize;
pub mod quad;
pub mod spline;
pub mod stats;

pub use basis::*;
pub use kernel::*;
pub use minimize::*;
pub use quad::*;
pub use spline::*;
pub use stats::*;
