use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag shared between an authoring tool and a
/// running fracture operation.
///
/// Fracture operations check the flag between clip steps; raising it makes
/// the operation return [`crate::fracture::SplitOutput::Cancelled`] without
/// mutating the asset.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Receives coarse-grained progress reports from fracture operations.
pub trait ProgressListener {
    /// Called with the current completion percentage, monotonically
    /// non-decreasing within one operation.
    fn on_progress(&mut self, percent: u32);
}

/// A listener that ignores every report.
pub struct NullProgress;

impl ProgressListener for NullProgress {
    fn on_progress(&mut self, _percent: u32) {}
}

/// Progress/cancellation plumbing handed to one fracture operation.
pub struct Progress<'a> {
    listener: &'a mut dyn ProgressListener,
    cancel: CancelFlag,
    total: u32,
    completed: u32,
    last_percent: u32,
}

impl<'a> Progress<'a> {
    /// Creates the plumbing for one operation.
    pub fn new(listener: &'a mut dyn ProgressListener, cancel: CancelFlag) -> Self {
        Progress {
            listener,
            cancel,
            total: 0,
            completed: 0,
            last_percent: u32::MAX,
        }
    }

    /// Sets the expected number of work units. An estimate is fine; reports
    /// are clamped to 100%.
    pub fn set_total(&mut self, total: u32) {
        self.total = total;
    }

    /// Advances by `units` and notifies the listener.
    pub fn advance(&mut self, units: u32) {
        self.completed += units;
        let percent = if self.total == 0 {
            100
        } else {
            (self.completed * 100 / self.total).min(100)
        };
        if percent != self.last_percent {
            self.last_percent = percent;
            self.listener.on_progress(percent);
        }
    }

    /// Whether the operation should stop at the next clip-step boundary.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
