//! magic-shell library target.
//!
//! The binary entry point is in `main.rs`; this file exists so `tests/*.rs`
//! can import the command line, logging and telemetry pieces.

pub mod cli;
pub mod logging;
pub mod telemetry;
