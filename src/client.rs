//! Client struct definition
//!
//! Represents an admitted session with its name, room and outbound queue.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SendError;
use crate::types::{ClientId, RoomName};

/// Sending half of a session's outbound queue. Items are complete,
/// newline-terminated lines; the session's writer task drains them.
pub type Outbox = mpsc::Sender<String>;

/// Admitted session as the Registry sees it
///
/// The username never changes once admitted; the room changes only
/// through the Registry.
#[derive(Debug, Clone)]
pub struct Client {
    /// Connection handle
    pub id: ClientId,
    /// Username
    pub username: String,
    /// Room this client currently belongs to
    pub room: RoomName,
    /// Server → Client line queue
    pub sender: Outbox,
}

impl Client {
    /// Create a new client in the given room
    pub fn new(id: ClientId, username: String, room: RoomName, sender: Outbox) -> Self {
        Self {
            id,
            username,
            room,
            sender,
        }
    }

    /// Queue a line for this client without waiting
    ///
    /// A full queue is reported instead of blocking the caller.
    pub fn try_send(&self, line: String) -> Result<(), SendError> {
        self.sender.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Move the client to another room
    pub fn set_room(&mut self, room: RoomName) {
        self.room = room;
    }
}
