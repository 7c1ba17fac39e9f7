//! Thumbnail prefetch for the scrub overlay.
//!
//! Drag events feed a [`VisibleWindowDebouncer`]. Each debounced window goes to
//! a [`ThumbnailPrefetchScheduler`] for the desired request set, and a
//! [`FetchReconciler`] turns that set into fetches to start and cancel.

mod debounce;
mod reconcile;
mod scheduler;
mod window;

pub use debounce::VisibleWindowDebouncer;
pub use reconcile::{FetchPlan, FetchReconciler};
pub use scheduler::{
    grid_step, PrefetchPhase, ThumbnailPrefetchScheduler, ThumbnailPriority, ThumbnailRequest,
};
pub use window::{TimeRange, VisibleWindow};
