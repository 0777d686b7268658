//! Room struct definition
//!
//! Represents a named chat room with an insertion-ordered member list.

use crate::types::{ClientId, RoomName};

/// Chat room
///
/// Members are kept in join order so `/list` output is deterministic.
#[derive(Debug)]
pub struct Room {
    /// Room name
    pub name: RoomName,
    /// Members in join order
    members: Vec<ClientId>,
}

impl Room {
    /// Create a new empty room
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    /// Check if nobody is in the room
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if a client is in this room
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains(&client_id)
    }

    /// Add a member
    ///
    /// Returns false if the client was already a member.
    pub fn add_member(&mut self, client_id: ClientId) -> bool {
        if self.contains(client_id) {
            false
        } else {
            self.members.push(client_id);
            true
        }
    }

    /// Remove a member
    ///
    /// Returns true if the client was a member.
    pub fn remove_member(&mut self, client_id: ClientId) -> bool {
        let before = self.members.len();
        self.members.retain(|id| *id != client_id);
        self.members.len() != before
    }

    /// Members in join order
    pub fn members(&self) -> &[ClientId] {
        &self.members
    }
}
