//! Session and room registry
//!
//! Single source of truth for who is connected and which room they are in.
//! Both maps (client → session, room → members) live behind one mutex so
//! that name checks, room changes and cleanup always see them consistently.
//!
//! The lock is only held for in-memory bookkeeping. Callers that need to
//! write to clients take a snapshot (see [`Registry::recipients`]) and do
//! the writes after the guard is dropped.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::{Client, Outbox};
use crate::error::{NameRejected, RoomChangeNoOp};
use crate::room::Room;
use crate::types::{ClientId, RoomName};

/// Usernames nobody may take, compared case-insensitively
pub const RESERVED_NAMES: [&str; 2] = ["server", "admin"];

/// Successful name negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub username: String,
    pub room: RoomName,
}

/// Successful room change, carrying both names for announcements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomChanged {
    pub old_room: RoomName,
    pub new_room: RoomName,
}

/// Session removed by [`Registry::unregister`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departed {
    pub username: String,
    pub room: RoomName,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// All admitted clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// All live rooms: RoomName -> Room
    rooms: HashMap<RoomName, Room>,
}

impl RegistryState {
    /// Remove a client from a room, dropping the room if it is now empty
    /// and is not the default room.
    fn leave_room(&mut self, client_id: ClientId, room_name: &RoomName, default_room: &RoomName) {
        let Some(room) = self.rooms.get_mut(room_name) else {
            return;
        };

        room.remove_member(client_id);

        if room.is_empty() && room_name != default_room {
            self.rooms.remove(room_name);
            debug!(room = %room_name, "room deleted (empty)");
        }
    }

    fn enter_room(&mut self, client_id: ClientId, room_name: &RoomName) {
        self.rooms
            .entry(room_name.clone())
            .or_insert_with(|| Room::new(room_name.clone()))
            .add_member(client_id);
    }
}

/// Registry of admitted sessions and rooms
#[derive(Debug)]
pub struct Registry {
    default_room: RoomName,
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Create a registry whose default room exists from the start
    pub fn new(default_room: RoomName) -> Self {
        let mut state = RegistryState::default();
        state
            .rooms
            .insert(default_room.clone(), Room::new(default_room.clone()));

        Self {
            default_room,
            state: Mutex::new(state),
        }
    }

    /// The room every session starts in; it is never deleted
    pub fn default_room(&self) -> &RoomName {
        &self.default_room
    }

    /// Check whether a name is reserved
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    }

    /// Admit a connection under `desired_name`
    ///
    /// The check and the insert happen under one lock acquisition, so two
    /// connections racing for the same name cannot both win. On success the
    /// client is placed in the default room.
    pub async fn try_register(
        &self,
        client_id: ClientId,
        desired_name: &str,
        sender: Outbox,
    ) -> Result<Admitted, NameRejected> {
        if desired_name.is_empty() {
            return Err(NameRejected::Empty);
        }
        if desired_name.chars().any(char::is_whitespace) {
            return Err(NameRejected::Whitespace(desired_name.to_string()));
        }
        if Self::is_reserved(desired_name) {
            return Err(NameRejected::Reserved(desired_name.to_string()));
        }

        let mut state = self.state.lock().await;

        if state.clients.values().any(|c| c.username == desired_name) {
            return Err(NameRejected::Taken(desired_name.to_string()));
        }

        let room = self.default_room.clone();
        let client = Client::new(client_id, desired_name.to_string(), room.clone(), sender);
        state.clients.insert(client_id, client);
        state.enter_room(client_id, &room);

        debug!(
            "Total clients: {}, Total rooms: {}",
            state.clients.len(),
            state.rooms.len()
        );

        Ok(Admitted {
            username: desired_name.to_string(),
            room,
        })
    }

    /// Remove a connection and its room membership
    ///
    /// Returns `None` if the connection was not registered, so a second
    /// cleanup is harmless.
    pub async fn unregister(&self, client_id: ClientId) -> Option<Departed> {
        let mut state = self.state.lock().await;

        let client = state.clients.remove(&client_id)?;
        state.leave_room(client_id, &client.room, &self.default_room);

        debug!(
            "Total clients: {}, Total rooms: {}",
            state.clients.len(),
            state.rooms.len()
        );

        Some(Departed {
            username: client.username,
            room: client.room,
        })
    }

    /// Move a connection into `new_room`, creating the room if needed
    pub async fn change_room(
        &self,
        client_id: ClientId,
        new_room: &str,
    ) -> Result<RoomChanged, RoomChangeNoOp> {
        if new_room.is_empty() {
            return Err(RoomChangeNoOp::EmptyName);
        }
        let new_room = RoomName::new(new_room);

        let mut state = self.state.lock().await;

        let old_room = match state.clients.get(&client_id) {
            Some(client) if client.room == new_room => return Err(RoomChangeNoOp::AlreadyThere),
            Some(client) => client.room.clone(),
            None => return Err(RoomChangeNoOp::NotRegistered),
        };

        state.leave_room(client_id, &old_room, &self.default_room);
        state.enter_room(client_id, &new_room);
        if let Some(client) = state.clients.get_mut(&client_id) {
            client.set_room(new_room.clone());
        }

        Ok(RoomChanged { old_room, new_room })
    }

    /// Usernames in a room, in join order
    ///
    /// Empty if the room does not exist.
    pub async fn members(&self, room_name: &RoomName) -> Vec<String> {
        let state = self.state.lock().await;

        let Some(room) = state.rooms.get(room_name) else {
            return Vec::new();
        };

        room.members()
            .iter()
            .filter_map(|id| state.clients.get(id))
            .map(|c| c.username.clone())
            .collect()
    }

    /// Look up a live session by exact (case-sensitive) username
    pub async fn find_by_username(&self, username: &str) -> Option<Client> {
        let state = self.state.lock().await;
        state
            .clients
            .values()
            .find(|c| c.username == username)
            .cloned()
    }

    /// Snapshot of every member of a room except `exclude`
    pub async fn recipients(&self, room_name: &RoomName, exclude: Option<ClientId>) -> Vec<Client> {
        let state = self.state.lock().await;

        let Some(room) = state.rooms.get(room_name) else {
            return Vec::new();
        };

        room.members()
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| state.clients.get(id))
            .cloned()
            .collect()
    }

    /// Names of all live rooms, sorted
    pub async fn room_names(&self) -> Vec<RoomName> {
        let state = self.state.lock().await;
        let mut names: Vec<RoomName> = state.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of admitted sessions
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::future::join_all;
    use tokio::sync::mpsc;

    use super::*;

    fn outbox() -> Outbox {
        let (tx, _rx) = mpsc::channel(8);
        tx
    }

    fn registry() -> Registry {
        Registry::new(RoomName::new("general"))
    }

    /// Every client is in exactly one room, and it is the room it records.
    async fn assert_consistent(registry: &Registry) {
        let state = registry.state.lock().await;
        for client in state.clients.values() {
            let rooms_holding: Vec<&RoomName> = state
                .rooms
                .values()
                .filter(|r| r.contains(client.id))
                .map(|r| &r.name)
                .collect();
            assert_eq!(rooms_holding, vec![&client.room], "client {}", client.username);
        }
        for room in state.rooms.values() {
            for id in room.members() {
                assert!(state.clients.contains_key(id));
            }
            if room.name != registry.default_room {
                assert!(!room.is_empty(), "empty room {} kept", room.name);
            }
        }
    }

    #[tokio::test]
    async fn test_register_places_client_in_default_room() {
        let registry = registry();
        let id = ClientId::new();

        let admitted = registry.try_register(id, "alice", outbox()).await.unwrap();

        assert_eq!(admitted.username, "alice");
        assert_eq!(admitted.room, RoomName::new("general"));
        assert_eq!(registry.members(&RoomName::new("general")).await, vec!["alice"]);
        assert_consistent(&registry).await;
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let registry = registry();
        let result = registry.try_register(ClientId::new(), "", outbox()).await;
        assert_eq!(result, Err(NameRejected::Empty));
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_inner_whitespace() {
        let registry = registry();
        for name in ["bob smith", "bob\tsmith"] {
            let result = registry.try_register(ClientId::new(), name, outbox()).await;
            assert_eq!(result, Err(NameRejected::Whitespace(name.to_string())));
        }
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_reserved_names_any_case() {
        let registry = registry();
        for name in ["Server", "ADMIN", "admin", "sErVeR"] {
            let result = registry.try_register(ClientId::new(), name, outbox()).await;
            assert_eq!(result, Err(NameRejected::Reserved(name.to_string())));
        }
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_name_case_sensitive() {
        let registry = registry();
        registry
            .try_register(ClientId::new(), "bob", outbox())
            .await
            .unwrap();

        let dup = registry.try_register(ClientId::new(), "bob", outbox()).await;
        assert_eq!(dup, Err(NameRejected::Taken("bob".to_string())));

        // Different case is a different name
        assert!(registry
            .try_register(ClientId::new(), "Bob", outbox())
            .await
            .is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_same_name_single_winner() {
        let registry = Arc::new(registry());

        let attempts = (0..32).map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .try_register(ClientId::new(), "bob", outbox())
                    .await
            })
        });

        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.expect("task panicked"))
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| *r == Err(NameRejected::Taken("bob".to_string()))));

        // The losers may retry with another name
        assert!(registry
            .try_register(ClientId::new(), "bob2", outbox())
            .await
            .is_ok());
        assert_consistent(&registry).await;
    }

    #[tokio::test]
    async fn test_unregister_frees_name_and_is_idempotent() {
        let registry = registry();
        let id = ClientId::new();
        registry.try_register(id, "alice", outbox()).await.unwrap();

        let departed = registry.unregister(id).await;
        assert_eq!(
            departed,
            Some(Departed {
                username: "alice".to_string(),
                room: RoomName::new("general"),
            })
        );
        assert_eq!(registry.unregister(id).await, None);

        // Default room survives being emptied
        assert_eq!(registry.room_names().await, vec![RoomName::new("general")]);
        assert!(registry
            .try_register(ClientId::new(), "alice", outbox())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_change_room_creates_and_collects_rooms() {
        let registry = registry();
        let alice = ClientId::new();
        let carol = ClientId::new();
        registry.try_register(alice, "alice", outbox()).await.unwrap();
        registry.try_register(carol, "carol", outbox()).await.unwrap();

        let changed = registry.change_room(alice, "lobby").await.unwrap();
        assert_eq!(changed.old_room, RoomName::new("general"));
        assert_eq!(changed.new_room, RoomName::new("lobby"));
        registry.change_room(carol, "lobby").await.unwrap();

        assert_eq!(
            registry.members(&RoomName::new("lobby")).await,
            vec!["alice", "carol"]
        );
        assert!(registry.members(&RoomName::new("general")).await.is_empty());
        assert_consistent(&registry).await;

        // Last member leaving via /join deletes the room
        registry.change_room(alice, "general").await.unwrap();
        registry.change_room(carol, "attic").await.unwrap();
        assert_eq!(
            registry.room_names().await,
            vec![RoomName::new("attic"), RoomName::new("general")]
        );

        // Last member leaving via disconnect deletes the room
        registry.unregister(carol).await;
        assert_eq!(registry.room_names().await, vec![RoomName::new("general")]);
        assert_consistent(&registry).await;
    }

    #[tokio::test]
    async fn test_change_room_no_ops() {
        let registry = registry();
        let alice = ClientId::new();
        registry.try_register(alice, "alice", outbox()).await.unwrap();

        assert_eq!(
            registry.change_room(alice, "").await,
            Err(RoomChangeNoOp::EmptyName)
        );
        assert_eq!(
            registry.change_room(alice, "general").await,
            Err(RoomChangeNoOp::AlreadyThere)
        );
        assert_eq!(
            registry.change_room(ClientId::new(), "lobby").await,
            Err(RoomChangeNoOp::NotRegistered)
        );
        assert_eq!(registry.room_names().await, vec![RoomName::new("general")]);
    }

    #[tokio::test]
    async fn test_find_by_username_exact_match() {
        let registry = registry();
        let bob = ClientId::new();
        registry.try_register(bob, "bob", outbox()).await.unwrap();

        assert_eq!(registry.find_by_username("bob").await.map(|c| c.id), Some(bob));
        assert!(registry.find_by_username("BOB").await.is_none());
        assert!(registry.find_by_username("bo").await.is_none());
    }

    #[tokio::test]
    async fn test_recipients_excludes_sender() {
        let registry = registry();
        let a = ClientId::new();
        let b = ClientId::new();
        let c = ClientId::new();
        registry.try_register(a, "a", outbox()).await.unwrap();
        registry.try_register(b, "b", outbox()).await.unwrap();
        registry.try_register(c, "c", outbox()).await.unwrap();
        registry.change_room(c, "elsewhere").await.unwrap();

        let ids: Vec<ClientId> = registry
            .recipients(&RoomName::new("general"), Some(a))
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![b]);

        let all = registry.recipients(&RoomName::new("general"), None).await;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_and_leaves_stay_consistent() {
        let registry = Arc::new(registry());
        let rooms = ["general", "lobby", "attic", "cellar"];

        let tasks = (0..16).map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let id = ClientId::new();
                registry
                    .try_register(id, &format!("user{i}"), outbox())
                    .await
                    .unwrap();
                for step in 0..20 {
                    let _ = registry.change_room(id, rooms[(i + step) % rooms.len()]).await;
                }
                if i % 2 == 0 {
                    registry.unregister(id).await;
                }
            })
        });
        for result in join_all(tasks).await {
            result.expect("task panicked");
        }

        assert_eq!(registry.client_count().await, 8);
        assert_consistent(&registry).await;
    }
}
