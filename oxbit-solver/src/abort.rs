//! Process-wide fatal error hook
//!
//! Internal invariant violations end in [`abort`]. The default handler logs
//! the message and panics; embedders may install their own handler, which
//! must not return. The hook is global: install it once during start-up,
//! not concurrently with running solvers.

use std::sync::RwLock;
use tracing::error;

/// Handler invoked on fatal errors
pub type AbortCallback = fn(&str);

static CALLBACK: RwLock<Option<AbortCallback>> = RwLock::new(None);

/// Install (or with `None`, remove) the fatal error handler
pub fn set_abort_callback(callback: Option<AbortCallback>) {
    match CALLBACK.write() {
        Ok(mut slot) => *slot = callback,
        Err(poisoned) => *poisoned.into_inner() = callback,
    }
}

/// Report a fatal error and never return
pub fn abort(msg: &str) -> ! {
    let callback = match CALLBACK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner(),
    };
    error!(message = msg, "fatal solver error");
    if let Some(cb) = callback {
        cb(msg);
    }
    panic!("oxbit: {msg}");
}
