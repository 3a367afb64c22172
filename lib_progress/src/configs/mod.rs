//! # Configuration Modules
//!
//! Settings for the progress log: capacity, flush cadence and the truncation
//! marker, loadable from JSON and overridable from the command line.

/// Provides the progress log configuration and its file loader.
pub mod progress_config;
