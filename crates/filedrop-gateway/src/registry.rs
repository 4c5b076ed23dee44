//! Room Registry (C3): create/join/leave and the TTL sweep.
//!
//! Grounded on `haven-gateway/src/dispatcher.rs`'s `RwLock<HashMap<...>>`
//! state-behind-a-cloneable-handle shape, and `haven-file-server/src/cleanup.rs`'s
//! interval-driven sweep loop for the room TTL eviction timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use filedrop_types::{Clock, PeerHandle, Room, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Exists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    NotFound,
    Full,
    /// The peer was already a member; join is treated as idempotent (§4.5).
    AlreadyMember,
}

/// Shared, cloneable handle over the server's room state. The registry is
/// conceptually single-threaded (§4.3): every operation takes the write lock,
/// so there is no interleaving between create/join/leave/sweep.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    max_peers_per_room: usize,
    room_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RoomRegistry {
    pub fn new(max_peers_per_room: usize, room_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), max_peers_per_room, room_ttl, clock }
    }

    pub async fn create(&self, room: &RoomId, by_peer: PeerHandle) -> CreateOutcome {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(room) {
            return CreateOutcome::Exists;
        }
        let mut r = Room::new(self.clock.now());
        r.peers.insert(by_peer);
        rooms.insert(room.clone(), r);
        CreateOutcome::Created
    }

    pub async fn join(&self, room: &RoomId, peer: PeerHandle) -> JoinOutcome {
        let mut rooms = self.rooms.write().await;
        let Some(r) = rooms.get_mut(room) else {
            return JoinOutcome::NotFound;
        };
        if r.peers.contains(&peer) {
            return JoinOutcome::AlreadyMember;
        }
        if r.peers.len() >= self.max_peers_per_room {
            return JoinOutcome::Full;
        }
        r.peers.insert(peer);
        JoinOutcome::Joined
    }

    /// Removes `peer` from every room they're in, deleting any room that
    /// becomes empty as a result. Returns the rooms the peer left, each
    /// paired with the remaining members (for notifying the room).
    pub async fn leave(&self, peer: PeerHandle) -> Vec<(RoomId, Vec<PeerHandle>)> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|room_id, room| {
            if room.peers.remove(&peer) {
                left.push((room_id.clone(), room.peers.iter().copied().collect()));
            }
            !room.is_empty()
        });
        left
    }

    pub async fn members_of(&self, room: &RoomId) -> Option<Vec<PeerHandle>> {
        self.rooms.read().await.get(room).map(|r| r.peers.iter().copied().collect())
    }

    pub async fn is_member(&self, room: &RoomId, peer: PeerHandle) -> bool {
        self.rooms.read().await.get(room).is_some_and(|r| r.peers.contains(&peer))
    }

    /// Deletes rooms older than `room_ttl`. Run on a timer (§4.3).
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.room_ttl;
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|_, room| !room.is_expired(now, ttl));
        let removed = before - rooms.len();
        if removed > 0 {
            info!(removed, "room sweep evicted expired rooms");
        }
        removed
    }

    #[cfg(test)]
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

/// Runs [`RoomRegistry::sweep`] on a fixed interval until the process exits.
pub async fn run_sweep_loop(registry: RoomRegistry, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        registry.sweep().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedrop_types::SystemClock;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(2, Duration::from_secs(1800), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn create_is_not_idempotent() {
        let reg = registry();
        let room = RoomId::parse("r1").unwrap();
        let peer = PeerHandle::new();
        assert_eq!(reg.create(&room, peer).await, CreateOutcome::Created);
        assert_eq!(reg.create(&room, peer).await, CreateOutcome::Exists);
    }

    #[tokio::test]
    async fn join_respects_capacity() {
        let reg = registry();
        let room = RoomId::parse("r1").unwrap();
        let a = PeerHandle::new();
        let b = PeerHandle::new();
        let c = PeerHandle::new();
        reg.create(&room, a).await;
        assert_eq!(reg.join(&room, b).await, JoinOutcome::Joined);
        assert_eq!(reg.join(&room, c).await, JoinOutcome::Full);
        assert_eq!(reg.join(&room, b).await, JoinOutcome::AlreadyMember);
    }

    #[tokio::test]
    async fn join_unknown_room_not_found() {
        let reg = registry();
        let room = RoomId::parse("ghost").unwrap();
        assert_eq!(reg.join(&room, PeerHandle::new()).await, JoinOutcome::NotFound);
    }

    #[tokio::test]
    async fn leave_deletes_empty_room() {
        let reg = registry();
        let room = RoomId::parse("r1").unwrap();
        let peer = PeerHandle::new();
        reg.create(&room, peer).await;
        assert_eq!(reg.room_count().await, 1);
        reg.leave(peer).await;
        assert_eq!(reg.room_count().await, 0);
    }

    #[tokio::test]
    async fn leave_keeps_room_with_remaining_members() {
        let reg = registry();
        let room = RoomId::parse("r1").unwrap();
        let a = PeerHandle::new();
        let b = PeerHandle::new();
        reg.create(&room, a).await;
        reg.join(&room, b).await;
        let left = reg.leave(a).await;
        assert_eq!(left, vec![(room.clone(), vec![b])]);
        assert_eq!(reg.room_count().await, 1);
    }
}
