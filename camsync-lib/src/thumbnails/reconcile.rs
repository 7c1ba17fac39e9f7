//! Diffing desired request sets against fetches already in flight.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::Serialize;

use crate::error::SyncError;
use crate::time::Timestamp;

use super::scheduler::{ThumbnailPrefetchScheduler, ThumbnailPriority, ThumbnailRequest};
use super::window::{TimeRange, VisibleWindow};

/// Work produced by one [`FetchReconciler::reconcile`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchPlan {
    /// New fetches, first-paint requests first, then by time.
    pub start: Vec<ThumbnailRequest>,
    /// In-flight fetches no longer wanted.
    pub cancel: Vec<Timestamp>,
    /// In-flight fetches still wanted.
    pub keep: Vec<Timestamp>,
}

impl FetchPlan {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.cancel.is_empty()
    }
}

/// Tracks fetch lifecycle so each recompute only touches the difference.
///
/// Completed and failed timestamps are not requested again until
/// [`clear_failures`](Self::clear_failures), [`forget`](Self::forget) or
/// [`retain_completed`](Self::retain_completed) drops them.
#[derive(Debug, Clone, Default)]
pub struct FetchReconciler {
    in_flight: BTreeMap<Timestamp, ThumbnailPriority>,
    completed: BTreeSet<Timestamp>,
    failed: BTreeMap<Timestamp, String>,
}

impl FetchReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the wanted set and return what to start and cancel.
    pub fn reconcile(&mut self, desired: &BTreeSet<ThumbnailRequest>) -> FetchPlan {
        let wanted: BTreeMap<Timestamp, ThumbnailPriority> = desired
            .iter()
            .map(|request| (request.timestamp, request.priority))
            .collect();

        let mut plan = FetchPlan::default();
        self.in_flight.retain(|timestamp, priority| match wanted.get(timestamp) {
            Some(new_priority) => {
                *priority = *new_priority;
                plan.keep.push(*timestamp);
                true
            }
            None => {
                plan.cancel.push(*timestamp);
                false
            }
        });

        for (timestamp, priority) in wanted {
            if self.in_flight.contains_key(&timestamp)
                || self.completed.contains(&timestamp)
                || self.failed.contains_key(&timestamp)
            {
                continue;
            }
            self.in_flight.insert(timestamp, priority);
            plan.start.push(ThumbnailRequest {
                timestamp,
                priority,
            });
        }
        plan.start
            .sort_by_key(|request| (request.priority, request.timestamp));

        if !plan.is_empty() {
            debug!(
                "thumbnail fetches: {} started, {} cancelled, {} kept",
                plan.start.len(),
                plan.cancel.len(),
                plan.keep.len()
            );
        }
        plan
    }

    /// Recompute the scheduler's set and reconcile against it.
    ///
    /// Desired timestamps this reconciler already completed are reported to
    /// the scheduler first. If that ends the first-paint phase the set is
    /// recomputed once more, so a reactivated overlay over cached thumbnails
    /// goes straight to the visible fill.
    pub fn refresh(
        &mut self,
        scheduler: &mut ThumbnailPrefetchScheduler,
        window: VisibleWindow,
        playhead: Timestamp,
        is_dragging: bool,
    ) -> FetchPlan {
        let mut desired = scheduler.recompute(window, playhead, is_dragging);
        let was_satisfied = scheduler.is_initial_satisfied();
        for request in &desired {
            if self.completed.contains(&request.timestamp) {
                scheduler.mark_completed(request.timestamp);
            }
        }
        if !was_satisfied && scheduler.is_initial_satisfied() {
            desired = scheduler.recompute(window, playhead, is_dragging);
        }
        self.reconcile(&desired)
    }

    /// Record a finished fetch and report it to `scheduler`.
    ///
    /// Returns true when this completion ended the first-paint phase. The
    /// caller should then [`refresh`](Self::refresh) to start the visible fill.
    pub fn complete_for(
        &mut self,
        scheduler: &mut ThumbnailPrefetchScheduler,
        timestamp: Timestamp,
    ) -> bool {
        if !self.complete(timestamp) {
            return false;
        }
        let was_satisfied = scheduler.is_initial_satisfied();
        scheduler.mark_completed(timestamp);
        !was_satisfied && scheduler.is_initial_satisfied()
    }

    /// Record a finished fetch. Returns false if it was not in flight.
    pub fn complete(&mut self, timestamp: Timestamp) -> bool {
        if self.in_flight.remove(&timestamp).is_none() {
            return false;
        }
        self.completed.insert(timestamp);
        true
    }

    /// Record a failed fetch. The thumbnail stays missing.
    pub fn fail(&mut self, timestamp: Timestamp, reason: impl Into<String>) -> SyncError {
        let reason = reason.into();
        self.in_flight.remove(&timestamp);
        warn!("thumbnail fetch at {} failed: {}", timestamp, reason);
        self.failed.insert(timestamp, reason.clone());
        SyncError::ThumbnailFetchFailed { timestamp, reason }
    }

    pub fn failures(&self) -> impl Iterator<Item = (Timestamp, &str)> {
        self.failed
            .iter()
            .map(|(timestamp, reason)| (*timestamp, reason.as_str()))
    }

    /// Allow failed timestamps to be requested again.
    pub fn clear_failures(&mut self) {
        self.failed.clear();
    }

    /// Drop a completed timestamp, e.g. after the image cache evicted it.
    pub fn forget(&mut self, timestamp: Timestamp) -> bool {
        self.completed.remove(&timestamp)
    }

    /// Keep only completed timestamps inside `range`.
    pub fn retain_completed(&mut self, range: TimeRange) {
        let before = self.completed.len();
        self.completed.retain(|timestamp| range.contains(*timestamp));
        let dropped = before - self.completed.len();
        if dropped > 0 {
            debug!("forgot {} completed thumbnails outside {:?}", dropped, range);
        }
    }

    pub fn clear_completed(&mut self) {
        self.completed.clear();
    }

    /// Cancel everything in flight, returning the cancelled timestamps.
    pub fn cancel_all(&mut self) -> Vec<Timestamp> {
        std::mem::take(&mut self.in_flight).into_keys().collect()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn is_completed(&self, timestamp: Timestamp) -> bool {
        self.completed.contains(&timestamp)
    }
}
