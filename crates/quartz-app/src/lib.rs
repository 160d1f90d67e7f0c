//! Application framework for the Quartz client.
//!
//! Ties the platform window, GPU context, and renderer together behind a
//! small run-loop entry point.

pub mod runner;

pub use runner::{run_app, AppConfig};
