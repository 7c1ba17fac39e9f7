//! Periodic group reporter for dashboards and logs.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::Duration,
};

use log::warn;

use crate::playback::GroupReport;

pub type Snapshot = Arc<dyn Fn() -> GroupReport + Send + Sync>;
pub type Callback = Arc<Mutex<dyn FnMut(GroupReport) + Send>>;

/// Background thread that samples a group at a fixed interval and forwards
/// each changed [`GroupReport`] to a callback.
#[derive(Clone)]
pub struct Reporter {
    snapshot: Snapshot,
    report: Callback,
    interval: Duration,
    finish: Arc<AtomicBool>,
    thread_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Reporter {
    /// # Arguments
    ///
    /// * `snapshot` - Produces the current report. Usually locks a shared group.
    /// * `report` - Receives every report that differs from the previous one.
    /// * `interval` - Sleep between samples.
    pub fn new(snapshot: Snapshot, report: Callback, interval: Duration) -> Self {
        Self {
            snapshot,
            report,
            interval,
            finish: Arc::new(AtomicBool::new(false)),
            thread_handle: Arc::new(Mutex::new(None)),
        }
    }

    fn run(&self) {
        let mut last_report: Option<GroupReport> = None;

        loop {
            let report = (self.snapshot)();
            if last_report.as_ref() != Some(&report) {
                match self.report.lock() {
                    Ok(mut callback) => (&mut *callback)(report.clone()),
                    Err(_) => {
                        warn!("reporter callback poisoned; stopping");
                        break;
                    }
                }
                last_report = Some(report);
            }

            if self.finish.load(Ordering::Relaxed) {
                break;
            }

            std::thread::sleep(self.interval);
        }
    }

    /// Start the background thread, replacing any running one.
    pub fn start(&self) {
        self.stop();
        self.finish.store(false, Ordering::Relaxed);
        let this = self.clone();
        let handle = std::thread::spawn(move || this.run());
        if let Ok(mut slot) = self.thread_handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Stop the background thread and wait for it.
    pub fn stop(&self) {
        self.finish.store(true, Ordering::Relaxed);
        let handle = match self.thread_handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                warn!("reporter stop called from reporter thread; skipping join");
            } else if handle.join().is_err() {
                warn!("reporter thread panicked during join");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.finish.load(Ordering::Relaxed)
            && self
                .thread_handle
                .lock()
                .map(|slot| slot.is_some())
                .unwrap_or(false)
    }
}
