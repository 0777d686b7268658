//! Time source for notice timestamps

use chrono::Local;

use crate::types::DisplayTimestamp;

/// Supplies the `[HH:MM]` label stamped on server notices and chat lines.
pub trait Clock: Send + Sync {
    fn now(&self) -> DisplayTimestamp;
}

/// Local wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DisplayTimestamp {
        DisplayTimestamp(Local::now().format("%H:%M").to_string())
    }
}

/// Clock frozen at a single label, for deterministic output in tests.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DisplayTimestamp {
        DisplayTimestamp(self.0.clone())
    }
}
