//! The Mode Gate (component C): an atomic two-state flag observed by both
//! the Reader and the Sync Controller.

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const SYNC: u8 = 1;

/// Binary engine state governing whether incoming bytes are routed to the
/// synchronous response path or to the async packetizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Sync,
}

impl From<u8> for Mode {
    fn from(v: u8) -> Self {
        if v == SYNC { Mode::Sync } else { Mode::Idle }
    }
}

/// Publish/acquire-ordered mode flag. The Sync Controller flips Idle→Sync
/// before writing the command bytes and flips Sync→Idle after it has
/// finished consuming from the Sync Channel; the Reader observes the flip
/// no later than one read iteration after it happened.
#[derive(Debug, Default)]
pub struct ModeGate(AtomicU8);

impl ModeGate {
    pub fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    pub fn load(&self) -> Mode {
        Mode::from(self.0.load(Ordering::Acquire))
    }

    pub fn enter_sync(&self) {
        self.0.store(SYNC, Ordering::Release);
    }

    pub fn enter_idle(&self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_flips_observe_immediately() {
        let gate = ModeGate::new();
        assert_eq!(gate.load(), Mode::Idle);
        gate.enter_sync();
        assert_eq!(gate.load(), Mode::Sync);
        gate.enter_idle();
        assert_eq!(gate.load(), Mode::Idle);
    }
}
