//! Local room registry: which sockets on *this* instance are subscribed
//! to which rooms.
//!
//! The registry is owned exclusively by its gateway instance; no other
//! instance ever mutates it. Cross-instance delivery goes through the
//! event bus and the broadcast adapter, both of which terminate in a
//! [`RoomRegistry::broadcast`] call here.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};

use crate::domain::{ConnectionId, RoomId};

use super::messages::ServerFrame;

/// Outbound frame channel for one connection.
///
/// Bounded: a client that cannot drain its socket loses realtime frames
/// rather than stalling the room (persisted messages remain recoverable
/// via the backlog).
pub type FrameSender = mpsc::Sender<ServerFrame>;

/// Tracks room subscriptions for locally-connected sockets.
///
/// Broadcasts (reads) vastly outnumber joins/leaves (writes), hence the
/// `RwLock`-guarded maps.
pub struct RoomRegistry {
    /// room -> connection -> outbound channel.
    rooms: RwLock<HashMap<RoomId, HashMap<ConnectionId, FrameSender>>>,

    /// connection -> joined rooms, for O(rooms) cleanup on disconnect.
    connections: RwLock<HashMap<ConnectionId, HashSet<RoomId>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes a connection to a room. Idempotent: re-joining replaces
    /// the stored sender.
    pub async fn join(&self, room_id: &RoomId, connection_id: ConnectionId, sender: FrameSender) {
        self.rooms
            .write()
            .await
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id, sender);

        self.connections
            .write()
            .await
            .entry(connection_id)
            .or_default()
            .insert(room_id.clone());
    }

    /// Removes a connection from every room it joined. Idempotent; called
    /// on disconnect.
    pub async fn leave_all(&self, connection_id: &ConnectionId) {
        let joined = self.connections.write().await.remove(connection_id);
        let Some(joined) = joined else { return };

        let mut rooms = self.rooms.write().await;
        for room_id in joined {
            if let Some(members) = rooms.get_mut(&room_id) {
                members.remove(connection_id);
                if members.is_empty() {
                    rooms.remove(&room_id);
                }
            }
        }
    }

    /// Sends a frame to every local socket subscribed to the room,
    /// optionally excluding one connection (the typing sender never hears
    /// its own indicator).
    ///
    /// Returns the number of sockets the frame was queued for. Sockets
    /// with a full or closed queue are skipped.
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        frame: &ServerFrame,
        except: Option<&ConnectionId>,
    ) -> usize {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(room_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (connection_id, sender) in members {
            if Some(connection_id) == except {
                continue;
            }
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::trace!(
                        connection_id = %connection_id,
                        room_id = %room_id,
                        "Dropping frame for slow or closed socket: {}",
                        err
                    );
                }
            }
        }
        delivered
    }

    /// Number of local sockets subscribed to a room.
    pub async fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Total connections with at least one subscription.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(s: &str) -> RoomId {
        RoomId::parse(s).unwrap()
    }

    fn channel() -> (FrameSender, mpsc::Receiver<ServerFrame>) {
        mpsc::channel(16)
    }

    #[tokio::test]
    async fn broadcast_reaches_all_room_members() {
        let registry = RoomRegistry::new();
        let r = room("room_a_b");
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.join(&r, ConnectionId::new(), tx1).await;
        registry.join(&r, ConnectionId::new(), tx2).await;

        let delivered = registry
            .broadcast(&r, &ServerFrame::error("ping"), None)
            .await;

        assert_eq!(delivered, 2);
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn broadcast_excludes_the_named_connection() {
        let registry = RoomRegistry::new();
        let r = room("room_a_b");
        let sender_conn = ConnectionId::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.join(&r, sender_conn, tx1).await;
        registry.join(&r, ConnectionId::new(), tx2).await;

        let delivered = registry
            .broadcast(&r, &ServerFrame::error("typing"), Some(&sender_conn))
            .await;

        assert_eq!(delivered, 1);
        assert!(rx2.recv().await.is_some());
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.join(&room("room_a_b"), ConnectionId::new(), tx1).await;
        registry.join(&room("room_c_d"), ConnectionId::new(), tx2).await;

        registry
            .broadcast(&room("room_a_b"), &ServerFrame::error("x"), None)
            .await;

        assert!(rx1.recv().await.is_some());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn connection_may_join_multiple_rooms() {
        let registry = RoomRegistry::new();
        let conn = ConnectionId::new();
        let (tx, mut rx) = channel();

        registry.join(&room("room_a_b"), conn, tx.clone()).await;
        registry.join(&room("room_c_d"), conn, tx).await;

        registry
            .broadcast(&room("room_a_b"), &ServerFrame::error("one"), None)
            .await;
        registry
            .broadcast(&room("room_c_d"), &ServerFrame::error("two"), None)
            .await;

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn leave_all_removes_every_subscription() {
        let registry = RoomRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = channel();

        registry.join(&room("room_a_b"), conn, tx.clone()).await;
        registry.join(&room("room_c_d"), conn, tx).await;
        assert_eq!(registry.connection_count().await, 1);

        registry.leave_all(&conn).await;

        assert_eq!(registry.connection_count().await, 0);
        assert_eq!(registry.member_count(&room("room_a_b")).await, 0);
        assert_eq!(registry.member_count(&room("room_c_d")).await, 0);
    }

    #[tokio::test]
    async fn leave_all_is_idempotent() {
        let registry = RoomRegistry::new();
        let conn = ConnectionId::new();
        registry.leave_all(&conn).await;
        registry.leave_all(&conn).await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_is_noop() {
        let registry = RoomRegistry::new();
        let delivered = registry
            .broadcast(&room("room_a_b"), &ServerFrame::error("x"), None)
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn full_queue_drops_frame_without_blocking() {
        let registry = RoomRegistry::new();
        let r = room("room_a_b");
        let (tx, _rx) = mpsc::channel(1);
        registry.join(&r, ConnectionId::new(), tx).await;

        // First frame fills the queue, second is dropped.
        let first = registry.broadcast(&r, &ServerFrame::error("a"), None).await;
        let second = registry.broadcast(&r, &ServerFrame::error("b"), None).await;

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }
}
