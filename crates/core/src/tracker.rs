// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence number coverage tracking
//!
//! A [`SequenceTracker`] is an interval set summarising which sequence numbers
//! a partition log actually contains. Ranges are closed, sorted, disjoint and
//! never adjacent: `[1, 5]` and `[6, 9]` are always stored as `[1, 9]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for "no further gaps, evaluation complete"
pub const INFINITE: u64 = u64::MAX;

/// First sequence number of the sequence space.
pub const FIRST_SEQ: u64 = 1;

/// A closed range of sequence numbers `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeqRange {
    pub lo: u64,
    pub hi: u64,
}

impl SeqRange {
    pub fn new(lo: u64, hi: u64) -> Self {
        debug_assert!(lo <= hi, "inverted range [{lo}, {hi}]");
        Self { lo, hi }
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.lo <= seq && seq <= self.hi
    }

    /// Number of sequence numbers in the range, saturating at `u64::MAX`
    pub fn count(&self) -> u64 {
        self.hi.saturating_sub(self.lo).saturating_add(1)
    }
}

impl fmt::Display for SeqRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hi == INFINITE {
            write!(f, "[{}, INF]", self.lo)
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

/// Interval set of known-present sequence numbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SeqRange>", into = "Vec<SeqRange>")]
pub struct SequenceTracker {
    ranges: Vec<SeqRange>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tracker from arbitrary (possibly overlapping) ranges
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let mut tracker = Self::new();
        for (lo, hi) in ranges {
            tracker.add_range(lo, hi);
        }
        tracker
    }

    /// Add `[lo, hi]`, merging with any overlapping or touching ranges.
    ///
    /// An inverted range (`lo > hi`) is ignored.
    pub fn add_range(&mut self, lo: u64, hi: u64) {
        if lo > hi {
            return;
        }

        // First range that could merge: its end reaches lo - 1
        let start = self
            .ranges
            .partition_point(|r| r.hi.saturating_add(1) < lo);
        // One past the last range that could merge: its start is within hi + 1
        let end = self
            .ranges
            .partition_point(|r| r.lo <= hi.saturating_add(1));

        if start >= end {
            self.ranges.insert(start, SeqRange::new(lo, hi));
            return;
        }

        let merged = SeqRange::new(
            lo.min(self.ranges[start].lo),
            hi.max(self.ranges[end - 1].hi),
        );
        self.ranges.splice(start..end, std::iter::once(merged));
    }

    /// Return the first gap at or after `seq`.
    ///
    /// The gap is the maximal run of missing sequence numbers that precedes the
    /// first range ending at or after `seq`, or the unbounded gap past the last
    /// range. When `seq` is covered, the gap starts right after the covering
    /// range. The returned gap may start below `seq`. `None` means coverage
    /// extends to [`INFINITE`].
    pub fn first_gap(&self, seq: u64) -> Option<SeqRange> {
        let idx = self.ranges.partition_point(|r| r.hi < seq);

        let Some(range) = self.ranges.get(idx) else {
            // Past every range: the unbounded tail
            let lo = self
                .ranges
                .last()
                .map_or(FIRST_SEQ, |r| r.hi.saturating_add(1));
            return Some(SeqRange::new(lo, INFINITE));
        };

        if seq < range.lo {
            let lo = match idx {
                0 => FIRST_SEQ,
                _ => self.ranges[idx - 1].hi + 1,
            };
            if lo < range.lo {
                return Some(SeqRange::new(lo, range.lo - 1));
            }
        }

        // Gap following `range`
        if range.hi == INFINITE {
            return None;
        }
        let hi = self
            .ranges
            .get(idx + 1)
            .map_or(INFINITE, |next| next.lo - 1);
        Some(SeqRange::new(range.hi + 1, hi))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total count of sequence numbers covered
    pub fn size_in_sequence(&self) -> u64 {
        self.ranges
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.count()))
    }

    pub fn ranges(&self) -> &[SeqRange] {
        &self.ranges
    }

    pub fn first_seq(&self) -> Option<u64> {
        self.ranges.first().map(|r| r.lo)
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.ranges.last().map(|r| r.hi)
    }

    pub fn contains(&self, seq: u64) -> bool {
        let idx = self.ranges.partition_point(|r| r.hi < seq);
        self.ranges.get(idx).is_some_and(|r| r.contains(seq))
    }

    /// True when no sequence number is covered by both trackers
    pub fn is_disjoint(&self, other: &SequenceTracker) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (self.ranges[i], other.ranges[j]);
            if a.hi < b.lo {
                i += 1;
            } else if b.hi < a.lo {
                j += 1;
            } else {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for SequenceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return write!(f, "<empty>");
        }
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", range)?;
        }
        Ok(())
    }
}

impl From<Vec<SeqRange>> for SequenceTracker {
    fn from(ranges: Vec<SeqRange>) -> Self {
        Self::from_ranges(ranges.into_iter().map(|r| (r.lo, r.hi)))
    }
}

impl From<SequenceTracker> for Vec<SeqRange> {
    fn from(tracker: SequenceTracker) -> Self {
        tracker.ranges
    }
}

impl FromIterator<(u64, u64)> for SequenceTracker {
    fn from_iter<T: IntoIterator<Item = (u64, u64)>>(iter: T) -> Self {
        Self::from_ranges(iter)
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
