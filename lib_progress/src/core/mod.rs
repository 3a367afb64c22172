//! # Core Progress Module
//!
//! This module holds the machinery that turns a high-frequency stream of
//! progress messages into a steady trickle of display updates.
//!
//! ## Core Components:
//!
//! - **`message_queue`**: The unbounded intake buffer. Producers append from any
//!   thread; the drainer takes the whole content in one step.
//!
//! - **`rolling_window`**: The bounded view of the most recent messages and the
//!   eviction policy that keeps it at `item_limit` rows, marking truncation
//!   with a sentinel row.
//!
//! - **`sink`**: The capability a display surface offers: a `TableView` that
//!   grows, clears and scrolls, reached only through the sink's own
//!   execution context.
//!
//! - **`drainer`**: The single background loop that waits for data, drains,
//!   delivers a batch and then sleeps for the flush interval.
//!
//! - **`progress_log`**: The owner that wires the pieces together, spawns the
//!   drainer and cancels it when disposed.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Thread-safe intake buffer with a wake-on-nonempty signal.
pub mod message_queue;
/// Capacity-bounded window of recent messages and its eviction policy.
pub mod rolling_window;
/// Display sink traits and the stock sinks.
pub mod sink;
/// The batch drainer loop and its report.
pub mod drainer;
/// The owning facade that spawns and disposes the drainer.
pub mod progress_log;

// --- Public API Re-exports ---
pub use message_queue::MessageQueue;
pub use rolling_window::{DrainBatch, RollingWindow, WindowUpdate, DEFAULT_SENTINEL, MIN_ITEM_LIMIT};
pub use sink::{DirectSink, ProgressSink, TableView};
pub use drainer::{BatchDrainer, DrainReport, DrainerState};
pub use progress_log::{ProgressHandle, ProgressLog};
