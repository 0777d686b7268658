//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based connection handle
//! - `RoomName`: case-sensitive room name
//! - `DisplayTimestamp`: `HH:MM` wall-clock label shown on notices

use uuid::Uuid;

/// Unique connection handle (newtype pattern)
///
/// Wraps a UUID v4. Used as the Registry's lookup key for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name
///
/// Case-sensitive and otherwise arbitrary. Rooms are created on first join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName(pub String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-clock label in `HH:MM` form
///
/// Renders as `[HH:MM]`, the prefix of every timestamped notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTimestamp(pub String);

impl std::fmt::Display for DisplayTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}
