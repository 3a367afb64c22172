//! # Batch Drainer
//!
//! The single consumer of a [`MessageQueue`]. One tokio task runs
//! [`BatchDrainer::run`], which repeats until cancelled:
//!
//! 1. wait until the queue is non-empty and take everything,
//! 2. keep the newest `item_limit` messages,
//! 3. apply them to the rolling window and the view on the sink's context,
//! 4. sleep for the flush interval.
//!
//! Coalescing is the point: under a fast producer a cycle typically carries
//! dozens of messages, so the display is updated about 25 times per second
//! instead of once per message.
//!
//! ## Cancellation
//!
//! The wait and the sleep both race the cancellation token, so shutdown is
//! observed within one cycle. Once cancellation is seen the sink is never
//! called again. Messages still queued at that point are never displayed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::configs::progress_config::ProgressConfig;
use crate::core::message_queue::MessageQueue;
use crate::core::rolling_window::{DrainBatch, RollingWindow, WindowUpdate};
use crate::core::sink::ProgressSink;
use crate::error::ProgressError;

/// Lifecycle of the drainer. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainerState {
    /// The loop is waiting, delivering or sleeping.
    Running,
    /// Cancellation was observed and the loop exited.
    #[default]
    Stopped,
}

/// Totals collected over the drainer's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Batches the sink applied.
    pub batches_delivered: u64,
    /// Messages that reached the window.
    pub messages_delivered: u64,
    /// Messages discarded because a single drain held more than `item_limit`.
    pub messages_dropped: u64,
    /// Updates that evicted rows and wrote the sentinel.
    pub evictions: u64,
    /// Final state of the loop.
    pub state: DrainerState,
}

/// The rolling window together with the sink it feeds. Moved onto a
/// blocking thread for each delivery and handed back afterwards.
struct Delivery<S> {
    window: RollingWindow,
    sink: S,
}

impl<S: ProgressSink> Delivery<S> {
    fn deliver(&mut self, batch: DrainBatch) -> Result<WindowUpdate, ProgressError> {
        let Delivery { window, sink } = self;
        let mut batch = Some(batch);
        let mut outcome = None;

        sink.run_on_owning_context(&mut |view| {
            let Some(batch) = batch.take() else {
                return;
            };
            view.set_redraw(false);
            let result = window.apply(batch);
            if let Ok(update) = &result {
                if let WindowUpdate::Rebuilt { .. } = update {
                    view.clear_all();
                }
                view.set_item_count(update.item_count());
                view.show_item(update.last_index(), &*window);
            }
            view.set_redraw(true);
            outcome = Some(result);
        });

        outcome.unwrap_or(Err(ProgressError::SinkUnavailable))
    }
}

/// The background loop draining a [`MessageQueue`] into a [`ProgressSink`].
pub struct BatchDrainer<S> {
    queue: Arc<MessageQueue>,
    delivery: Option<Delivery<S>>,
    item_limit: usize,
    flush_interval: Duration,
    token: CancellationToken,
    running: Arc<AtomicBool>,
}

impl<S: ProgressSink> BatchDrainer<S> {
    /// Prepares a drainer; nothing runs until [`BatchDrainer::run`] is polled.
    pub fn new(queue: Arc<MessageQueue>, sink: S, config: &ProgressConfig, token: CancellationToken) -> Self {
        let item_limit = config.effective_item_limit();
        Self {
            queue,
            delivery: Some(Delivery {
                window: RollingWindow::with_sentinel(item_limit, config.sentinel.clone()),
                sink,
            }),
            item_limit,
            flush_interval: config.flush_interval(),
            token,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared flag that turns `false` once the loop has stopped.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Runs until the token is cancelled, then closes the queue.
    ///
    /// # Errors
    /// [`ProgressError::DrainerPanicked`] if the sink panicked while applying
    /// a batch. Cancellation is not an error.
    pub async fn run(mut self) -> Result<DrainReport, ProgressError> {
        log::debug!(
            "Batch drainer started (item limit {}, flush interval {:?})",
            self.item_limit,
            self.flush_interval
        );

        let mut report = DrainReport::default();
        let outcome = self.drain_loop(&mut report).await;

        let discarded = self.queue.close();
        if discarded > 0 {
            log::debug!("Discarded {} undrained messages at shutdown", discarded);
        }
        self.running.store(false, Ordering::Release);
        report.state = DrainerState::Stopped;

        match &outcome {
            Ok(()) => log::debug!(
                "Batch drainer stopped after {} batches ({} messages, {} dropped)",
                report.batches_delivered,
                report.messages_delivered,
                report.messages_dropped
            ),
            Err(e) => log::error!("Batch drainer aborted: {}", e),
        }
        outcome.map(|()| report)
    }

    async fn drain_loop(&mut self, report: &mut DrainReport) -> Result<(), ProgressError> {
        loop {
            let drained = match self.queue.drain_all(&self.token).await {
                Ok(drained) => drained,
                Err(ProgressError::Canceled) => return Ok(()),
                Err(e) => return Err(e),
            };
            // The token may have fired while the queue lock was held.
            if self.token.is_cancelled() {
                return Ok(());
            }

            let batch = DrainBatch::newest(drained, self.item_limit);
            if batch.dropped() > 0 {
                log::debug!("Dropped {} queued messages beyond the item limit", batch.dropped());
                report.messages_dropped += batch.dropped() as u64;
            }
            let size = batch.len();

            let delivery = self.delivery.take().ok_or(ProgressError::SinkUnavailable)?;
            let (delivery, outcome) = tokio::task::spawn_blocking(move || {
                let mut delivery = delivery;
                let outcome = delivery.deliver(batch);
                (delivery, outcome)
            })
            .await
            .map_err(|e| ProgressError::DrainerPanicked(e.to_string()))?;
            self.delivery = Some(delivery);

            match outcome {
                Ok(update) => {
                    report.batches_delivered += 1;
                    report.messages_delivered += size as u64;
                    if let WindowUpdate::Rebuilt { evicted, .. } = update {
                        report.evictions += 1;
                        log::debug!("Evicted {} rows from the rolling window", evicted);
                    }
                }
                Err(e) => log::error!("Discarding batch of {} messages: {}", size, e),
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.flush_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::{DirectSink, TableView};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CallLog {
        calls: Vec<String>,
    }

    impl TableView for CallLog {
        fn set_redraw(&mut self, enabled: bool) {
            self.calls.push(format!("redraw:{enabled}"));
        }

        fn set_item_count(&mut self, count: usize) {
            self.calls.push(format!("count:{count}"));
        }

        fn clear_all(&mut self) {
            self.calls.push("clear".to_string());
        }

        fn show_item(&mut self, index: usize, rows: &RollingWindow) {
            self.calls.push(format!("show:{index}:{}", rows.get(index).unwrap_or("?")));
        }
    }

    struct DeafSink;

    impl ProgressSink for DeafSink {
        fn run_on_owning_context(&mut self, _job: &mut dyn FnMut(&mut dyn TableView)) {}
    }

    fn batch(items: &[&str], limit: usize) -> DrainBatch {
        DrainBatch::newest(items.iter().map(|s| s.to_string()).collect(), limit)
    }

    #[test]
    fn test_delivery_sequence_for_append_then_rebuild() {
        let mut delivery = Delivery {
            window: RollingWindow::new(2),
            sink: DirectSink::new(CallLog::default()),
        };

        let first = delivery.deliver(batch(&["a"], 2)).unwrap();
        assert_eq!(first, WindowUpdate::Appended { item_count: 1 });
        let second = delivery.deliver(batch(&["b", "c"], 2)).unwrap();
        assert_eq!(second, WindowUpdate::Rebuilt { item_count: 2, evicted: 1 });

        let calls = delivery.sink.into_inner().calls;
        assert_eq!(
            calls,
            vec![
                "redraw:false",
                "count:1",
                "show:0:a",
                "redraw:true",
                "redraw:false",
                "clear",
                "count:2",
                "show:1:c",
                "redraw:true",
            ]
        );
    }

    #[test]
    fn test_sink_that_skips_the_job_is_reported() {
        let mut delivery = Delivery { window: RollingWindow::new(3), sink: DeafSink };
        assert_eq!(delivery.deliver(batch(&["a"], 3)), Err(ProgressError::SinkUnavailable));
        assert!(delivery.window.is_empty());
    }

    #[tokio::test]
    async fn test_run_exits_without_touching_sink_when_cancelled_idle() {
        let view = Arc::new(Mutex::new(CallLog::default()));
        let token = CancellationToken::new();
        let drainer = BatchDrainer::new(
            Arc::new(MessageQueue::new()),
            Arc::clone(&view),
            &ProgressConfig::default(),
            token.clone(),
        );
        let running = drainer.running_flag();
        let task = tokio::spawn(drainer.run());

        token.cancel();
        let report = task.await.unwrap().unwrap();

        assert_eq!(report.state, DrainerState::Stopped);
        assert_eq!(report.batches_delivered, 0);
        assert!(!running.load(Ordering::Acquire));
        assert!(view.lock().unwrap().calls.is_empty());
    }
}
