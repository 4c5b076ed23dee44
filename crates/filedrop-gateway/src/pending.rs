//! Pending-join tracking: a peer's outstanding `request-join`, awaiting
//! approval, rejection, or disconnect (§3 `PendingJoin`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use filedrop_types::{PeerHandle, RoomId};

#[derive(Clone, Default)]
pub struct PendingJoins {
    inner: Arc<RwLock<HashMap<PeerHandle, RoomId>>>,
}

impl PendingJoins {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, peer: PeerHandle, room: RoomId) {
        self.inner.write().await.insert(peer, room);
    }

    /// Clears the pending join for `peer` if it matches `room`, returning
    /// whether it was present and matched.
    pub async fn take_matching(&self, peer: PeerHandle, room: &RoomId) -> bool {
        let mut inner = self.inner.write().await;
        if inner.get(&peer) == Some(room) {
            inner.remove(&peer);
            true
        } else {
            false
        }
    }

    pub async fn remove(&self, peer: PeerHandle) {
        self.inner.write().await.remove(&peer);
    }

    pub async fn get(&self, peer: PeerHandle) -> Option<RoomId> {
        self.inner.read().await.get(&peer).cloned()
    }
}
