//! Cooperative termination
//!
//! A [`TerminationMonitor`] combines a user callback with a flag that other
//! threads can raise through a [`TerminationHandle`]. Engines poll
//! [`TerminationMonitor::should_terminate`] at their loop boundaries and
//! answer `unknown` once it returns true. The callback runs on the solving
//! thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// User termination callback; returning true requests termination
pub type TerminateCallback = Box<dyn FnMut() -> bool + Send>;

/// Polled source of termination requests, shared by all engines of a solver
#[derive(Clone, Default)]
pub struct TerminationMonitor {
    flag: Arc<AtomicBool>,
    callback: Option<Arc<Mutex<TerminateCallback>>>,
}

impl fmt::Debug for TerminationMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminationMonitor")
            .field("terminated", &self.is_terminated())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl TerminationMonitor {
    /// Monitor without callback
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the callback
    pub fn set_callback(&mut self, callback: Option<TerminateCallback>) {
        self.callback = callback.map(|cb| Arc::new(Mutex::new(cb)));
    }

    /// Has termination been requested and not yet cleared
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Poll the flag, then the callback; a positive callback raises the flag
    pub fn should_terminate(&self) -> bool {
        if self.is_terminated() {
            return true;
        }
        let fired = match &self.callback {
            Some(cb) => match cb.lock() {
                Ok(mut f) => (*f)(),
                Err(poisoned) => {
                    let mut f = poisoned.into_inner();
                    (*f)()
                }
            },
            None => false,
        };
        if fired {
            self.flag.store(true, Ordering::Release);
        }
        fired
    }

    /// Raise the flag
    pub fn terminate(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Lower the flag
    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Handle for requesting termination from another thread
    #[must_use]
    pub fn handle(&self) -> TerminationHandle {
        TerminationHandle {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Closure suitable as a SAT backend terminator
    #[must_use]
    pub fn sat_terminator(&self) -> oxbit_sat::Terminator {
        let monitor = self.clone();
        Box::new(move || monitor.should_terminate())
    }
}

/// Thread-safe handle that interrupts a running check
#[derive(Debug, Clone)]
pub struct TerminationHandle {
    flag: Arc<AtomicBool>,
}

impl TerminationHandle {
    /// Request termination of the current (or next) check
    pub fn terminate(&self) {
        self.flag.store(true, Ordering::Release);
    }
}
