//! Room fan-out
//!
//! Delivery is best-effort: the recipient list is snapshotted under the
//! registry lock and each line is then queued without waiting. A peer whose
//! queue is full or closed is skipped and logged; removing it is left to
//! that peer's own session handler.

use tracing::warn;

use crate::registry::Registry;
use crate::types::{ClientId, RoomName};

/// Stateless fan-out helper
#[derive(Debug, Clone, Copy, Default)]
pub struct Broadcaster;

impl Broadcaster {
    /// Queue `line` for every member of `room` except `exclude`
    ///
    /// Returns the number of recipients the line was queued for.
    pub async fn broadcast(
        registry: &Registry,
        line: &str,
        room: &RoomName,
        exclude: Option<ClientId>,
    ) -> usize {
        let recipients = registry.recipients(room, exclude).await;

        let mut delivered = 0;
        for recipient in recipients {
            match recipient.try_send(line.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    client_id = %recipient.id,
                    username = %recipient.username,
                    room = %room,
                    "dropping broadcast: {}",
                    e
                ),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    async fn join(
        registry: &Registry,
        name: &str,
        capacity: usize,
    ) -> (ClientId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = ClientId::new();
        registry.try_register(id, name, tx).await.unwrap();
        (id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let registry = Registry::new(RoomName::new("general"));
        let (alice, mut alice_rx) = join(&registry, "alice", 8).await;
        let (_bob, mut bob_rx) = join(&registry, "bob", 8).await;
        let (_carol, mut carol_rx) = join(&registry, "carol", 8).await;

        let delivered =
            Broadcaster::broadcast(&registry, "hi\n", registry.default_room(), Some(alice)).await;

        assert_eq!(delivered, 2);
        assert_eq!(bob_rx.recv().await.as_deref(), Some("hi\n"));
        assert_eq!(carol_rx.recv().await.as_deref(), Some("hi\n"));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        let registry = Registry::new(RoomName::new("general"));
        let (_alice, mut alice_rx) = join(&registry, "alice", 8).await;
        let (_bob, mut bob_rx) = join(&registry, "bob", 8).await;

        let delivered = Broadcaster::broadcast(&registry, "x\n", registry.default_room(), None).await;

        assert_eq!(delivered, 2);
        assert!(alice_rx.recv().await.is_some());
        assert!(bob_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_stays_in_room() {
        let registry = Registry::new(RoomName::new("general"));
        let (alice, _alice_rx) = join(&registry, "alice", 8).await;
        let (_bob, mut bob_rx) = join(&registry, "bob", 8).await;
        registry.change_room(alice, "lobby").await.unwrap();

        let delivered =
            Broadcaster::broadcast(&registry, "secret\n", &RoomName::new("lobby"), Some(alice)).await;

        assert_eq!(delivered, 0);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_or_slow_peer_does_not_stop_fan_out() {
        let registry = Registry::new(RoomName::new("general"));
        let (_dead, dead_rx) = join(&registry, "dead", 8).await;
        let (_slow, _slow_rx) = join(&registry, "slow", 1).await;
        let (_ok, mut ok_rx) = join(&registry, "ok", 8).await;
        drop(dead_rx);

        Broadcaster::broadcast(&registry, "1\n", registry.default_room(), None).await;
        let delivered = Broadcaster::broadcast(&registry, "2\n", registry.default_room(), None).await;

        // "slow" is full after the first line and "dead" never accepts
        assert_eq!(delivered, 1);
        assert_eq!(ok_rx.recv().await.as_deref(), Some("1\n"));
        assert_eq!(ok_rx.recv().await.as_deref(), Some("2\n"));
    }
}
