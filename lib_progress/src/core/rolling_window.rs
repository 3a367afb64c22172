//! # Rolling Window and Eviction Policy
//!
//! The rolling window is the ordered list of rows currently backing the
//! display. It never holds more than `item_limit` rows.
//!
//! ## Update rule
//!
//! For each batch (at most `item_limit` messages, see [`DrainBatch`]):
//!
//! 1. If `len + batch.len() <= item_limit`, the batch is appended.
//! 2. Otherwise `len + batch.len() - item_limit` rows are evicted from the
//!    front, the batch is appended and row 0 is overwritten with the sentinel.
//!
//! The overwrite happens even on the very first overflow by a single row, so
//! one real message is replaced rather than evicted. After any rebuild the
//! window holds exactly `item_limit` rows: the sentinel followed by the
//! newest `item_limit - 1` messages.

use std::collections::VecDeque;

use crate::error::ProgressError;

/// Marker row that replaces the oldest surviving entry once history was cut.
pub const DEFAULT_SENTINEL: &str = "...";

/// Smallest usable capacity: one sentinel row plus one real message.
pub const MIN_ITEM_LIMIT: usize = 2;

/// One drain cycle's worth of messages, already cut down to the newest
/// `item_limit` of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainBatch {
    messages: Vec<String>,
    dropped: usize,
}

impl DrainBatch {
    /// Keeps the newest `item_limit` entries of `drained` and counts the rest
    /// as dropped. Order is preserved.
    pub fn newest(mut drained: Vec<String>, item_limit: usize) -> Self {
        let dropped = drained.len().saturating_sub(item_limit);
        if dropped > 0 {
            drained.drain(..dropped);
        }
        Self { messages: drained, dropped }
    }

    /// Messages that will be delivered.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Older messages discarded before ever reaching the window.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of messages that will be delivered.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing is left to deliver.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consumes the batch, yielding its messages.
    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

/// What a single [`RollingWindow::apply`] did, so the view can mirror it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdate {
    /// The batch fit; the view only needs to grow to `item_count` rows.
    Appended {
        /// Row count after the update.
        item_count: usize,
    },
    /// Rows were evicted and row 0 now holds the sentinel; every cached row
    /// in the view is stale.
    Rebuilt {
        /// Row count after the update, always equal to the capacity.
        item_count: usize,
        /// Rows removed from the front.
        evicted: usize,
    },
}

impl WindowUpdate {
    /// Row count after the update.
    pub fn item_count(&self) -> usize {
        match *self {
            WindowUpdate::Appended { item_count } | WindowUpdate::Rebuilt { item_count, .. } => item_count,
        }
    }

    /// Index of the row the view should reveal.
    pub fn last_index(&self) -> usize {
        self.item_count().saturating_sub(1)
    }
}

/// Ordered, capacity-bounded list of the most recent messages.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    items: VecDeque<String>,
    item_limit: usize,
    sentinel: String,
    truncated: bool,
}

impl RollingWindow {
    /// Creates an empty window; capacities below [`MIN_ITEM_LIMIT`] are raised to it.
    pub fn new(item_limit: usize) -> Self {
        Self::with_sentinel(item_limit, DEFAULT_SENTINEL)
    }

    /// Same as [`RollingWindow::new`] with a custom truncation marker.
    pub fn with_sentinel(item_limit: usize, sentinel: impl Into<String>) -> Self {
        let item_limit = item_limit.max(MIN_ITEM_LIMIT);
        Self {
            items: VecDeque::with_capacity(item_limit),
            item_limit,
            sentinel: sentinel.into(),
            truncated: false,
        }
    }

    /// Applies one batch following the update rule described at module level.
    ///
    /// # Errors
    /// [`ProgressError::InvalidArgument`] if the batch is empty or larger than
    /// the capacity. Both are prevented by construction in the drainer.
    pub fn apply(&mut self, batch: DrainBatch) -> Result<WindowUpdate, ProgressError> {
        if batch.is_empty() {
            return Err(ProgressError::InvalidArgument("cannot deliver an empty batch".to_string()));
        }
        if batch.len() > self.item_limit {
            return Err(ProgressError::InvalidArgument(format!(
                "batch of {} messages exceeds the item limit of {}",
                batch.len(),
                self.item_limit
            )));
        }

        let projected = self.items.len() + batch.len();
        if projected <= self.item_limit {
            self.items.extend(batch.into_messages());
            return Ok(WindowUpdate::Appended { item_count: projected });
        }

        // batch.len() <= item_limit, so the overflow never exceeds the current length.
        let evicted = projected - self.item_limit;
        self.items.drain(..evicted);
        self.items.extend(batch.into_messages());
        if let Some(front) = self.items.front_mut() {
            front.clone_from(&self.sentinel);
        }
        self.truncated = true;
        Ok(WindowUpdate::Rebuilt { item_count: self.item_limit, evicted })
    }

    /// Row text at `index`, as a virtual table would pull it.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    /// Current number of rows.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` before the first delivery.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The fixed capacity after clamping.
    pub fn item_limit(&self) -> usize {
        self.item_limit
    }

    /// The truncation marker.
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Whether history has been evicted and row 0 holds the truncation marker.
    /// A message whose text merely equals the marker does not count.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Iterates rows front to back.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(String::as_str)
    }

    /// Copies the rows into a vector, mostly for inspection.
    pub fn to_vec(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(items: &[&str], limit: usize) -> DrainBatch {
        DrainBatch::newest(items.iter().map(|s| s.to_string()).collect(), limit)
    }

    #[test]
    fn test_capacity_is_clamped_to_two() {
        assert_eq!(RollingWindow::new(0).item_limit(), 2);
        assert_eq!(RollingWindow::new(1).item_limit(), 2);
        assert_eq!(RollingWindow::new(7).item_limit(), 7);
    }

    #[test]
    fn test_single_message_no_sentinel() {
        let mut window = RollingWindow::new(2);
        let update = window.apply(batch(&["x"], 2)).unwrap();
        assert_eq!(update, WindowUpdate::Appended { item_count: 1 });
        assert_eq!(window.to_vec(), vec!["x"]);
        assert!(!window.is_truncated());
    }

    #[test]
    fn test_one_by_one_overflow_keeps_two_newest_plus_sentinel() {
        let mut window = RollingWindow::new(3);
        let mut updates = Vec::new();
        for m in ["a", "b", "c", "d", "e"] {
            updates.push(window.apply(batch(&[m], 3)).unwrap());
        }
        assert_eq!(window.to_vec(), vec!["...", "d", "e"]);
        assert!(window.is_truncated());
        assert_eq!(updates[2], WindowUpdate::Appended { item_count: 3 });
        assert_eq!(updates[3], WindowUpdate::Rebuilt { item_count: 3, evicted: 1 });
    }

    #[test]
    fn test_first_overflow_by_one_replaces_a_real_message() {
        // Filling to capacity and then adding one row loses two real rows: one
        // evicted, one overwritten by the sentinel.
        let mut window = RollingWindow::new(4);
        window.apply(batch(&["1", "2", "3", "4"], 4)).unwrap();
        window.apply(batch(&["5"], 4)).unwrap();
        assert_eq!(window.to_vec(), vec!["...", "3", "4", "5"]);
    }

    #[test]
    fn test_full_batch_replaces_everything() {
        let mut window = RollingWindow::new(3);
        window.apply(batch(&["a", "b"], 3)).unwrap();
        let update = window.apply(batch(&["c", "d", "e"], 3)).unwrap();
        assert_eq!(update, WindowUpdate::Rebuilt { item_count: 3, evicted: 2 });
        assert_eq!(window.to_vec(), vec!["...", "d", "e"]);
    }

    #[test]
    fn test_no_loss_before_capacity() {
        let mut window = RollingWindow::new(5);
        window.apply(batch(&["a", "b"], 5)).unwrap();
        window.apply(batch(&["c"], 5)).unwrap();
        window.apply(batch(&["d", "e"], 5)).unwrap();
        assert_eq!(window.to_vec(), vec!["a", "b", "c", "d", "e"]);
        assert!(!window.is_truncated());
    }

    #[test]
    fn test_window_never_exceeds_limit_for_mixed_batches() {
        let limit = 6;
        let mut window = RollingWindow::new(limit);
        let mut next = 0usize;
        let mut delivered: Vec<String> = Vec::new();
        for size in [1usize, 4, 2, 6, 3, 1, 5, 6, 2] {
            let items: Vec<String> = (next..next + size).map(|i| i.to_string()).collect();
            next += size;
            delivered.extend(items.iter().cloned());
            window.apply(DrainBatch::newest(items, limit)).unwrap();
            assert!(window.len() <= limit);
        }
        let rows = window.to_vec();
        assert_eq!(rows[0], "...");
        assert_eq!(rows[1..], delivered[delivered.len() - (limit - 1)..]);
    }

    #[test]
    fn test_message_matching_sentinel_is_not_truncation() {
        let mut window = RollingWindow::new(3);
        window.apply(batch(&["...", "b", "c"], 3)).unwrap();
        assert_eq!(window.to_vec(), vec!["...", "b", "c"]);
        assert!(!window.is_truncated());

        window.apply(batch(&["d"], 3)).unwrap();
        assert!(window.is_truncated());
    }

    #[test]
    fn test_custom_sentinel() {
        let mut window = RollingWindow::with_sentinel(2, "[truncated]");
        window.apply(batch(&["a", "b", "c"], 2)).unwrap();
        assert_eq!(window.to_vec(), vec!["[truncated]", "c"]);
        assert_eq!(window.get(1), Some("c"));
        assert_eq!(window.get(2), None);
    }

    #[test]
    fn test_drain_batch_keeps_newest() {
        let b = batch(&["1", "2", "3", "4", "5"], 3);
        assert_eq!(b.messages(), ["3", "4", "5"]);
        assert_eq!(b.dropped(), 2);

        let small = batch(&["1"], 3);
        assert_eq!(small.dropped(), 0);
        assert_eq!(small.len(), 1);
    }

    #[test]
    fn test_contract_violations_are_rejected() {
        let mut window = RollingWindow::new(2);
        assert!(matches!(
            window.apply(DrainBatch::newest(Vec::new(), 2)),
            Err(ProgressError::InvalidArgument(_))
        ));
        assert!(matches!(
            window.apply(batch(&["a", "b", "c"], 10)),
            Err(ProgressError::InvalidArgument(_))
        ));
        assert!(window.is_empty());
    }
}
