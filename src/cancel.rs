//! Cooperative stop request.
//!
//! A signal handler or another context calls [`CancelToken::cancel`]; long
//! running loops check [`CancelToken::is_cancelled`] between protocol
//! operations, never inside a register write, capture or sample.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CancelToken {
    stopped: AtomicBool,
}

impl CancelToken {
    pub const fn new() -> Self {
        CancelToken {
            stopped: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Arm the token again for the next run.
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::Release);
    }
}
