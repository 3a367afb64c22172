//! # Progress Log
//!
//! Owns the queue and the drainer task. Producers append through the log or
//! through cheap [`ProgressHandle`] clones; disposing the display is modelled
//! by [`ProgressLog::shutdown`], by cancelling a parent token, or by dropping
//! the log.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::{Arc, Mutex};
//! use lib_progress::{ProgressConfig, ProgressLog, RollingWindow, TableView};
//!
//! struct Rows(usize);
//! impl TableView for Rows {
//!     fn set_item_count(&mut self, count: usize) { self.0 = count; }
//!     fn clear_all(&mut self) {}
//!     fn show_item(&mut self, _index: usize, _rows: &RollingWindow) {}
//! }
//!
//! # async fn demo() -> Result<(), lib_progress::ProgressError> {
//! let log = ProgressLog::spawn(&ProgressConfig::default(), Arc::new(Mutex::new(Rows(0))))?;
//! let producer = log.handle();
//! std::thread::spawn(move || producer.append("file 1 indexed"));
//! let report = log.close().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::configs::progress_config::ProgressConfig;
use crate::core::drainer::{BatchDrainer, DrainReport, DrainerState};
use crate::core::message_queue::MessageQueue;
use crate::core::sink::ProgressSink;
use crate::error::ProgressError;

/// A clonable producer-side handle. Appending never blocks beyond a mutex.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    queue: Arc<MessageQueue>,
}

impl ProgressHandle {
    /// Queues a message for display. Accepted even after shutdown, but once
    /// the drainer has stopped the message is discarded instead of queued.
    pub fn append(&self, message: impl Into<String>) {
        self.queue.enqueue(message);
    }

    /// Messages waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Owner of one rolling progress display.
pub struct ProgressLog {
    queue: Arc<MessageQueue>,
    token: CancellationToken,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<Result<DrainReport, ProgressError>>>,
}

impl ProgressLog {
    /// Spawns the drainer on the current tokio runtime.
    ///
    /// # Errors
    /// [`ProgressError::NoRuntime`] when called outside a runtime.
    pub fn spawn<S: ProgressSink>(config: &ProgressConfig, sink: S) -> Result<Self, ProgressError> {
        Self::spawn_with_parent(config, sink, &CancellationToken::new())
    }

    /// Like [`ProgressLog::spawn`], but cancelling `parent` also disposes the log.
    pub fn spawn_with_parent<S: ProgressSink>(
        config: &ProgressConfig,
        sink: S,
        parent: &CancellationToken,
    ) -> Result<Self, ProgressError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ProgressError::NoRuntime)?;

        let queue = Arc::new(MessageQueue::new());
        let token = parent.child_token();
        let drainer = BatchDrainer::new(Arc::clone(&queue), sink, config, token.clone());
        let running = drainer.running_flag();
        let task = runtime.spawn(drainer.run());

        log::info!(
            "Progress log started (item limit {}, flush interval {} ms)",
            config.effective_item_limit(),
            config.flush_interval_ms
        );

        Ok(Self { queue, token, running, task: Some(task) })
    }

    /// Queues a message for display.
    pub fn append(&self, message: impl Into<String>) {
        self.queue.enqueue(message);
    }

    /// A handle producers on other threads can own.
    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle { queue: Arc::clone(&self.queue) }
    }

    /// Messages waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether the drainer loop is still alive.
    pub fn state(&self) -> DrainerState {
        if self.running.load(Ordering::Acquire) {
            DrainerState::Running
        } else {
            DrainerState::Stopped
        }
    }

    /// The token driving this log; cancelling it equals [`ProgressLog::shutdown`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signals the drainer to stop. Idempotent, never fails.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            log::debug!("Progress log shutdown requested");
        }
        self.token.cancel();
    }

    /// Waits for the drainer to finish without cancelling it. Returns once
    /// something else cancels the token, or early with
    /// [`ProgressError::DrainerPanicked`] if the sink panicked mid-delivery.
    pub async fn join(mut self) -> Result<DrainReport, ProgressError> {
        match self.task.take() {
            Some(task) => task.await.map_err(|e| ProgressError::DrainerPanicked(e.to_string()))?,
            None => Ok(DrainReport::default()),
        }
    }

    /// Shuts down and waits for the drainer to stop.
    pub async fn close(self) -> Result<DrainReport, ProgressError> {
        self.shutdown();
        self.join().await
    }
}

impl Drop for ProgressLog {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
