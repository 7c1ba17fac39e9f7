use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Fraction of the outer time range currently visible while scrubbing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleWindow {
    pub start_ratio: f64,
    pub end_ratio: f64,
}

impl VisibleWindow {
    pub const FULL: VisibleWindow = VisibleWindow {
        start_ratio: 0.0,
        end_ratio: 1.0,
    };

    /// Build a window, clamping both ends into `[0, 1]` and ordering them.
    pub fn new(start_ratio: f64, end_ratio: f64) -> Self {
        let start = clamp_ratio(start_ratio, 0.0);
        let end = clamp_ratio(end_ratio, 1.0);
        Self {
            start_ratio: start.min(end),
            end_ratio: start.max(end),
        }
    }

    pub fn span(&self) -> f64 {
        self.end_ratio - self.start_ratio
    }

    /// Shift by `delta` keeping the span, stopping at the edges.
    pub fn panned(&self, delta: f64) -> Self {
        let current = Self::new(self.start_ratio, self.end_ratio);
        let span = current.span();
        let start = (current.start_ratio + delta).clamp(0.0, 1.0 - span);
        Self::new(start, start + span)
    }
}

fn clamp_ratio(ratio: f64, fallback: f64) -> f64 {
    if ratio.is_nan() {
        fallback
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Closed wall-clock interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn duration(&self) -> Duration {
        self.start.abs_diff(self.end)
    }

    pub fn contains(&self, time: Timestamp) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn at_ratio(&self, ratio: f64) -> Timestamp {
        let start = self.start.as_nanos() as i128;
        let end = self.end.as_nanos() as i128;
        let offset = ((end - start) as f64 * clamp_ratio(ratio, 0.0)).round() as i128;
        // Float rounding on very wide ranges can land just past either end.
        let nanos = (start + offset).clamp(start, end);
        Timestamp::from_nanos(nanos as i64)
    }

    /// Sub-range covered by `window`.
    pub fn slice(&self, window: VisibleWindow) -> TimeRange {
        TimeRange::new(self.at_ratio(window.start_ratio), self.at_ratio(window.end_ratio))
    }

    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(TimeRange { start, end })
    }
}
