//! Row-range partitioning for worker deployment
//!
//! The coordinator divides board rows `0..n` into one contiguous range per
//! worker, as evenly as possible: the first `n % workers` ranges get one
//! extra row. Ranges are half-open so that a surplus worker (more workers
//! than rows) simply gets an empty range.

use serde::{Deserialize, Serialize};

/// A half-open range of board rows `[start, end)` assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    pub start: u8,
    pub end: u8,
}

impl RowRange {
    pub fn len(&self) -> usize {
        usize::from(self.end.saturating_sub(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, row: u8) -> bool {
        self.start <= row && row < self.end
    }
}

impl std::fmt::Display for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Split rows `0..n` into `workers` contiguous ranges differing in size by at
/// most one
///
/// Returns an empty vector when `workers` is zero; callers validate worker
/// counts before partitioning.
pub fn partition_rows(n: u8, workers: usize) -> Vec<RowRange> {
    if workers == 0 {
        return Vec::new();
    }
    let base = usize::from(n) / workers;
    let extra = usize::from(n) % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0usize;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        ranges.push(RowRange {
            start: start as u8,
            end: (start + len) as u8,
        });
        start += len;
    }
    ranges
}
