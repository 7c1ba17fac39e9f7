//! Trailing-edge debounce for scrub gestures.

use std::time::{Duration, Instant};

use crate::settings::SyncSettings;

use super::window::VisibleWindow;

type Subscriber = Box<dyn FnMut(VisibleWindow) + Send>;

/// Collapses a burst of window updates into one value once input goes quiet.
///
/// Cooperative: the owner calls [`poll`](Self::poll) from its event loop. Every
/// [`submit`](Self::submit) cancels the pending emission and restarts the wait.
pub struct VisibleWindowDebouncer {
    delay: Duration,
    pending: Option<(VisibleWindow, Instant)>,
    last_emitted: Option<VisibleWindow>,
    subscribers: Vec<Subscriber>,
}

impl VisibleWindowDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            last_emitted: None,
            subscribers: Vec::new(),
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.debounce())
    }

    /// Register a callback invoked with every emitted window.
    pub fn subscribe(&mut self, subscriber: impl FnMut(VisibleWindow) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Record the latest window from a drag-move event at time `at`.
    pub fn submit(&mut self, window: VisibleWindow, at: Instant) {
        self.pending = Some((window, at + self.delay));
    }

    /// Emit the pending window if its quiet period has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<VisibleWindow> {
        let (window, due) = self.pending?;
        if now < due {
            return None;
        }
        self.pending = None;
        self.last_emitted = Some(window);
        for subscriber in self.subscribers.iter_mut() {
            subscriber(window);
        }
        Some(window)
    }

    /// Drop any pending emission.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// When the pending window becomes due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, due)| due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_emitted(&self) -> Option<VisibleWindow> {
        self.last_emitted
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn burst_emits_once_after_quiet_period() {
        let mut debouncer = VisibleWindowDebouncer::new(Duration::from_millis(300));
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sink = emitted.clone();
        debouncer.subscribe(move |window| sink.lock().unwrap().push(window));

        let start = Instant::now();
        let mut last = start;
        for i in 0..50_u64 {
            let at = start + Duration::from_millis(i * 10);
            debouncer.submit(VisibleWindow::new(i as f64 / 100.0, 0.9), at);
            assert_eq!(debouncer.poll(at), None);
            last = at;
        }

        assert_eq!(debouncer.poll(last + Duration::from_millis(299)), None);
        let window = debouncer.poll(last + Duration::from_millis(300));
        assert_eq!(window, Some(VisibleWindow::new(0.49, 0.9)));
        assert_eq!(debouncer.poll(last + Duration::from_secs(5)), None);

        let emitted = emitted.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0], VisibleWindow::new(0.49, 0.9));
    }

    #[test]
    fn submit_restarts_the_timer() {
        let mut debouncer = VisibleWindowDebouncer::new(Duration::from_millis(300));
        let start = Instant::now();
        debouncer.submit(VisibleWindow::FULL, start);
        debouncer.submit(VisibleWindow::new(0.1, 0.2), start + Duration::from_millis(250));
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.next_deadline(),
            Some(start + Duration::from_millis(550))
        );
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(550)),
            Some(VisibleWindow::new(0.1, 0.2))
        );
    }

    #[test]
    fn cancel_discards_pending_window() {
        let mut debouncer = VisibleWindowDebouncer::new(Duration::from_millis(300));
        let start = Instant::now();
        debouncer.submit(VisibleWindow::FULL, start);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
        assert_eq!(debouncer.last_emitted(), None);
    }
}
