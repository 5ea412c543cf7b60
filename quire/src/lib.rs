//! Expose quire's internal API for use in integration tests and benches. The
//! passes themselves live in `quire-passes`; this crate only wires them to
//! files, configuration and the command line.
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod utils;
