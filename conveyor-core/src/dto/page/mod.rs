//! Paged listings

use serde::{Deserialize, Serialize};

/// A window of a listing
///
/// `start` and `end` are inclusive positions in the full listing; `total` is
/// the size of the full listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cuts the `start..=end` window out of a full listing
    ///
    /// `end` clamps to the last item; a window past the end is empty.
    pub fn window(all: Vec<T>, start: usize, end: usize) -> Self {
        let total = all.len();
        if start >= total || end < start {
            return Self {
                items: Vec::new(),
                start,
                end: start,
                total,
            };
        }
        let end = end.min(total - 1);
        let items = all.into_iter().skip(start).take(end - start + 1).collect();
        Self {
            items,
            start,
            end,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
