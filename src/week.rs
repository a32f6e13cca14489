//! Cyclic week arithmetic
//!
//! eBird barcharts divide the year into 48 weeks (4 per month). The annual
//! cycle repeats, so week 47 is adjacent to week 0. Every wraparound-aware
//! computation in the crate goes through [`CyclicWeek`] and [`WeekSpan`].

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of weeks in an eBird barchart year
pub const WEEKS_PER_YEAR: usize = 48;

/// Number of barchart weeks per calendar month
pub const WEEKS_PER_MONTH: usize = 4;

/// A week index in `0..48` on the annual cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct CyclicWeek(usize);

impl TryFrom<usize> for CyclicWeek {
    type Error = ValidationError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::checked(index).ok_or(ValidationError::InvalidWeek(index))
    }
}

impl From<CyclicWeek> for usize {
    fn from(week: CyclicWeek) -> usize {
        week.0
    }
}

impl CyclicWeek {
    /// Create a week, wrapping any index onto the cycle
    pub fn new(index: usize) -> Self {
        Self(index % WEEKS_PER_YEAR)
    }

    /// Create a week from an index that must already be in range
    pub fn checked(index: usize) -> Option<Self> {
        (index < WEEKS_PER_YEAR).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Move forward (positive) or backward (negative) around the cycle
    pub fn offset(self, delta: isize) -> Self {
        let n = WEEKS_PER_YEAR as isize;
        Self((self.0 as isize + delta).rem_euclid(n) as usize)
    }

    pub fn next(self) -> Self {
        self.offset(1)
    }

    pub fn prev(self) -> Self {
        self.offset(-1)
    }

    /// Steps needed to walk forward from `self` to `other`
    pub fn forward_distance(self, other: CyclicWeek) -> usize {
        (other.0 + WEEKS_PER_YEAR - self.0) % WEEKS_PER_YEAR
    }

    /// Shortest distance between two weeks in either direction
    pub fn distance(self, other: CyclicWeek) -> usize {
        let forward = self.forward_distance(other);
        forward.min(WEEKS_PER_YEAR - forward)
    }
}

impl fmt::Display for CyclicWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive span of weeks on the cycle.
///
/// `end` may be numerically smaller than `start`; the span then wraps across
/// the year boundary (e.g. weeks 44..=7 for winter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSpan {
    pub start: CyclicWeek,
    pub end: CyclicWeek,
}

impl WeekSpan {
    pub fn new(start: CyclicWeek, end: CyclicWeek) -> Self {
        Self { start, end }
    }

    /// Span from raw indices, wrapping them onto the cycle
    pub fn from_indices(start: usize, end: usize) -> Self {
        Self::new(CyclicWeek::new(start), CyclicWeek::new(end))
    }

    /// The whole year starting at week 0
    pub fn full_year() -> Self {
        Self::from_indices(0, WEEKS_PER_YEAR - 1)
    }

    /// Number of weeks covered (1..=48)
    pub fn len(&self) -> usize {
        self.start.forward_distance(self.end) + 1
    }

    /// Whether the span crosses from week 47 to week 0
    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, week: CyclicWeek) -> bool {
        self.start.forward_distance(week) < self.len()
    }

    /// Weeks of the span in cyclic order, starting at `start`
    pub fn iter(&self) -> impl Iterator<Item = CyclicWeek> {
        let start = self.start;
        (0..self.len()).map(move |i| start.offset(i as isize))
    }

    /// Number of weeks shared with another span
    pub fn overlap(&self, other: &WeekSpan) -> usize {
        self.iter().filter(|w| other.contains(*w)).count()
    }
}

impl fmt::Display for WeekSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
