//! Shared connection status observed by the Reader and the Engine.
//!
//! A single flag serves both the caller-initiated shutdown signal and the
//! Reader's own fatal-fault report: either one transitions the Engine to
//! Closed, and the distinction doesn't matter to a caller — "connection not
//! available" is the only observable outcome either way (see §7's
//! propagation policy).

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ConnectionStatus {
    closed: AtomicBool,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Marks the connection closed. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
