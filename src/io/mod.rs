//! Result packer: output folder layout, writers and readers (`export`).

pub mod export;

pub use export::*;
