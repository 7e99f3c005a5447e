//! `spf-fit` library crate.
//!
//! The binary (`spf`) is a thin wrapper around this library so that the fitting core
//! is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;

#[cfg(test)]
mod test_support;
