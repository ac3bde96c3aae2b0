//! Application ("wall") time source.
//!
//! The engine never samples a system clock itself: every process of a cluster
//! receives the same externally distributed application time, and the time
//! manager only ever reads it through [`ApplicationClock`].

use std::sync::Arc;

use parking_lot::RwLock;

/// Supplies the current application time in seconds.
pub trait ApplicationClock {
    fn application_time(&self) -> f64;
}

/// A clock whose value is pushed in from outside (cluster master, test, ...).
///
/// Clones share the same underlying value, so the driver keeps one handle and
/// hands another to the time manager.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<RwLock<f64>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn set(&self, now: f64) {
        *self.now.write() = now;
    }

    pub fn advance(&self, dt: f64) {
        *self.now.write() += dt;
    }
}

impl ApplicationClock for ManualClock {
    fn application_time(&self) -> f64 {
        *self.now.read()
    }
}
