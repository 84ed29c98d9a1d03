//! `punchdrain` library crate.
//!
//! Re-exports the driver modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod app;
pub mod args;
pub mod config;
pub mod report;
pub mod size;
