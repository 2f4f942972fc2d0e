//! Merging occupied slots into contiguous intervals.

use std::fmt;

/// Inclusive slot range `[start, end]` within one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotInterval {
    pub start: usize,
    pub end: usize,
}

impl SlotInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false; an interval holds at least one slot.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, slot: usize) -> bool {
        (self.start..=self.end).contains(&slot)
    }
}

/// `7` for a singleton, `7-9` otherwise.
impl fmt::Display for SlotInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Merges strictly increasing slot indices into minimal intervals, in one
/// pass.
///
/// # Examples
///
/// ```
/// use u_bulkport::interpret::{merge_runs, SlotInterval};
///
/// assert_eq!(
///     merge_runs(&[3, 7, 8, 9]),
///     vec![SlotInterval::new(3, 3), SlotInterval::new(7, 9)]
/// );
/// ```
pub fn merge_runs(slots: &[usize]) -> Vec<SlotInterval> {
    let mut out: Vec<SlotInterval> = Vec::new();
    for &slot in slots {
        match out.last_mut() {
            Some(last) if slot == last.end + 1 => last.end = slot,
            _ => out.push(SlotInterval::new(slot, slot)),
        }
    }
    out
}

/// Renders intervals as `3;7-9`.
pub fn format_intervals(intervals: &[SlotInterval]) -> String {
    intervals
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(";")
}
