//! # lib_progress
//!
//! A bounded rolling progress log. Any number of producer threads append short
//! status lines ("file N indexed"); a single background drainer coalesces them
//! and hands them to a slow display sink at a fixed cadence, keeping only the
//! most recent `item_limit` rows.

// Declare the modules to re-export
pub mod configs;
pub mod core;
pub mod error;
#[cfg(feature = "loggers")]
pub mod loggers;

// Re-export everything
pub use configs::progress_config::*;
pub use self::core::*;
pub use error::*;
