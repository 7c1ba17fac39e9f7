//! Bounded thumbnail request sets for the scrub overlay.
//!
//! Each activation starts with a small batch clustered around the playhead for
//! fast first paint, then switches to an evenly spaced fill of the visible
//! window. Every call returns the complete desired set; diffing against
//! in-flight fetches is the job of [`FetchReconciler`](super::FetchReconciler).
//!
//! Request timestamps sit on a grid of "nice" steps anchored at the Unix
//! epoch, so windows that overlap share timestamps and their fetches survive
//! a pan.

use std::collections::BTreeSet;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::settings::SyncSettings;
use crate::time::{duration_to_nanos, Timestamp};

use super::window::{TimeRange, VisibleWindow};

const NICE_STEPS_SECS: [u64; 18] = [
    1, 2, 5, 10, 15, 30, 60, 120, 300, 600, 900, 1_800, 3_600, 7_200, 10_800, 21_600, 43_200,
    86_400,
];
const DAY_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThumbnailPriority {
    Initial,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub timestamp: Timestamp,
    pub priority: ThumbnailPriority,
}

impl ThumbnailRequest {
    pub fn initial(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            priority: ThumbnailPriority::Initial,
        }
    }

    pub fn visible(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            priority: ThumbnailPriority::Visible,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrefetchPhase {
    Inactive,
    Initial,
    Visible,
}

/// Produces the desired thumbnail set for the current overlay state.
#[derive(Debug, Clone)]
pub struct ThumbnailPrefetchScheduler {
    range: TimeRange,
    num_initial: usize,
    initial_radius: Duration,
    num_visible: usize,
    phase: PrefetchPhase,
    activation_window: Option<VisibleWindow>,
    playhead: Option<Timestamp>,
    initial_satisfied: bool,
}

impl ThumbnailPrefetchScheduler {
    /// Create a scheduler over the outer time range the overlay spans.
    pub fn new(range: TimeRange, settings: &SyncSettings) -> Self {
        Self {
            range,
            num_initial: settings.num_initial_thumbnails.max(1),
            initial_radius: settings.initial_radius(),
            num_visible: settings.num_visible_thumbnails.max(1),
            phase: PrefetchPhase::Inactive,
            activation_window: None,
            playhead: None,
            initial_satisfied: false,
        }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Replace the outer range. A different range ends the current activation.
    pub fn set_range(&mut self, range: TimeRange) {
        if range != self.range {
            self.deactivate();
            self.range = range;
        }
    }

    pub fn phase(&self) -> PrefetchPhase {
        self.phase
    }

    /// Compute the full replacement request set.
    ///
    /// # Arguments
    ///
    /// * `window` - Debounced visible window.
    /// * `playhead_time` - Current playhead, centre of the first-paint batch.
    /// * `is_dragging` - Overlay visible. When false the set is empty and the
    ///   next activation starts over with a first-paint batch.
    ///
    /// # Returns
    ///
    /// The desired set. Identical inputs give identical sets.
    pub fn recompute(
        &mut self,
        window: VisibleWindow,
        playhead_time: Timestamp,
        is_dragging: bool,
    ) -> BTreeSet<ThumbnailRequest> {
        if !is_dragging {
            if self.phase != PrefetchPhase::Inactive {
                debug!("thumbnail overlay hidden; releasing all requests");
                self.deactivate();
            }
            return BTreeSet::new();
        }

        let window = VisibleWindow::new(window.start_ratio, window.end_ratio);
        if self.phase == PrefetchPhase::Inactive {
            debug!("thumbnail overlay activated at {}", playhead_time);
            self.phase = PrefetchPhase::Initial;
            self.activation_window = Some(window);
        }
        self.playhead = Some(playhead_time);

        if self.phase == PrefetchPhase::Initial
            && (self.initial_satisfied || self.activation_window != Some(window))
        {
            debug!(
                "thumbnail prefetch switching to visible window {:.3}..{:.3}",
                window.start_ratio, window.end_ratio
            );
            self.phase = PrefetchPhase::Visible;
        }

        match self.phase {
            PrefetchPhase::Initial => self.initial_requests(playhead_time),
            PrefetchPhase::Visible => self.visible_requests(window),
            PrefetchPhase::Inactive => BTreeSet::new(),
        }
    }

    /// Report a completed fetch. A completion near the playhead satisfies the
    /// first-paint phase.
    pub fn mark_completed(&mut self, timestamp: Timestamp) {
        if self.initial_satisfied || self.phase == PrefetchPhase::Inactive {
            return;
        }
        let near_playhead = self
            .playhead
            .is_some_and(|playhead| playhead.abs_diff(timestamp) <= self.initial_radius);
        if near_playhead {
            debug!("first-paint thumbnail at {} completed", timestamp);
            self.initial_satisfied = true;
        }
    }

    pub fn is_initial_satisfied(&self) -> bool {
        self.initial_satisfied
    }

    /// Up to `num_initial` grid points nearest the playhead within the radius.
    pub fn initial_requests(&self, playhead_time: Timestamp) -> BTreeSet<ThumbnailRequest> {
        let around = TimeRange::new(
            playhead_time - self.initial_radius,
            playhead_time + self.initial_radius,
        );
        let Some(area) = around.intersect(&self.range) else {
            return BTreeSet::new();
        };
        let step = grid_step(
            self.initial_radius.saturating_mul(2) / count_divisor(self.num_initial),
        );
        let mut points: Vec<Timestamp> = grid_points(area, step).collect();
        points.sort_by_key(|time| (time.abs_diff(playhead_time), *time));
        points
            .into_iter()
            .take(self.num_initial)
            .map(ThumbnailRequest::initial)
            .collect()
    }

    /// Up to `num_visible` evenly spaced grid points inside the window.
    pub fn visible_requests(&self, window: VisibleWindow) -> BTreeSet<ThumbnailRequest> {
        let slice = self.range.slice(window);
        let step = grid_step(slice.duration() / count_divisor(self.num_visible));
        grid_points(slice, step)
            .take(self.num_visible)
            .map(ThumbnailRequest::visible)
            .collect()
    }

    fn deactivate(&mut self) {
        self.phase = PrefetchPhase::Inactive;
        self.activation_window = None;
        self.playhead = None;
        self.initial_satisfied = false;
    }
}

fn count_divisor(count: usize) -> u32 {
    u32::try_from(count.max(1)).unwrap_or(u32::MAX)
}

/// Smallest nice step that is at least `raw`.
pub fn grid_step(raw: Duration) -> Duration {
    let raw_secs = raw.as_secs_f64();
    NICE_STEPS_SECS
        .iter()
        .find(|secs| **secs as f64 >= raw_secs)
        .map(|secs| Duration::from_secs(*secs))
        .unwrap_or_else(|| {
            let days = (raw_secs / DAY_SECS as f64).ceil().max(1.0) as u64;
            Duration::from_secs(days.saturating_mul(DAY_SECS))
        })
}

/// Multiples of `step` (counted from the epoch) that fall inside `range`.
fn grid_points(range: TimeRange, step: Duration) -> impl Iterator<Item = Timestamp> {
    let step = duration_to_nanos(step).max(1) as i128;
    let first = -(-(range.start.as_nanos() as i128)).div_euclid(step);
    let last = (range.end.as_nanos() as i128).div_euclid(step);
    // Every multiple between `first` and `last` lies inside the i64 range.
    (first..=last).map(move |k| Timestamp::from_nanos((k * step) as i64))
}
