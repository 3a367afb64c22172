//! # Display Sink
//!
//! The drainer never touches a display directly. It asks the sink to run a
//! job on whatever context owns the display (a UI thread, a locked shared
//! view, or simply the caller) and the job drives a [`TableView`].
//!
//! The view behaves like a virtual table: it only tracks a row count and pulls
//! row text from the [`RollingWindow`] it is handed when it needs to paint.

use std::sync::{Arc, Mutex};

use crate::core::rolling_window::RollingWindow;

/// A row-based display surface.
pub trait TableView: Send {
    /// Suspends (`false`) or resumes (`true`) repainting around a bulk update.
    fn set_redraw(&mut self, _enabled: bool) {}

    /// Sets the number of visible rows.
    fn set_item_count(&mut self, count: usize);

    /// Drops every cached row so the next paint pulls fresh text.
    fn clear_all(&mut self);

    /// Scrolls so that row `index` is visible. `rows` backs every row of the view.
    fn show_item(&mut self, index: usize, rows: &RollingWindow);
}

/// A display that can only be touched from its own execution context.
pub trait ProgressSink: Send + 'static {
    /// Runs `job` against the view on the owning context and returns once the
    /// job has finished. The drainer calls this from a blocking thread, so
    /// waiting on another thread here is fine.
    fn run_on_owning_context(&mut self, job: &mut dyn FnMut(&mut dyn TableView));
}

/// A sink that owns its view and runs jobs inline on the calling thread.
#[derive(Debug, Default)]
pub struct DirectSink<V> {
    view: V,
}

impl<V: TableView + 'static> DirectSink<V> {
    /// Wraps `view`.
    pub fn new(view: V) -> Self {
        Self { view }
    }

    /// Gives the view back.
    pub fn into_inner(self) -> V {
        self.view
    }
}

impl<V: TableView + 'static> ProgressSink for DirectSink<V> {
    fn run_on_owning_context(&mut self, job: &mut dyn FnMut(&mut dyn TableView)) {
        job(&mut self.view);
    }
}

/// A view shared with other threads; holding its lock is its owning context.
impl<V: TableView + 'static> ProgressSink for Arc<Mutex<V>> {
    fn run_on_owning_context(&mut self, job: &mut dyn FnMut(&mut dyn TableView)) {
        let mut view = self.lock().unwrap_or_else(|e| e.into_inner());
        job(&mut *view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingView {
        count: usize,
        clears: usize,
    }

    impl TableView for CountingView {
        fn set_item_count(&mut self, count: usize) {
            self.count = count;
        }

        fn clear_all(&mut self) {
            self.clears += 1;
        }

        fn show_item(&mut self, _index: usize, _rows: &RollingWindow) {}
    }

    #[test]
    fn test_direct_sink_runs_job_inline() {
        let mut sink = DirectSink::new(CountingView::default());
        sink.run_on_owning_context(&mut |view| {
            view.clear_all();
            view.set_item_count(3);
        });
        let view = sink.into_inner();
        assert_eq!(view.count, 3);
        assert_eq!(view.clears, 1);
    }

    #[test]
    fn test_shared_sink_is_visible_to_other_handles() {
        let shared = Arc::new(Mutex::new(CountingView::default()));
        let mut sink = Arc::clone(&shared);
        sink.run_on_owning_context(&mut |view| view.set_item_count(9));
        assert_eq!(shared.lock().unwrap().count, 9);
    }
}
