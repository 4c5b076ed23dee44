use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a [`RoomId`], per spec §3.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// A room identifier: `^[A-Za-z0-9_-]{1,64}$`.
///
/// The canonical issuance path is [`RoomId::generate`] (16 random bytes as
/// lowercase hex), but any matching string is accepted via [`RoomId::parse`]
/// so a receiver can type a shared link by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid room id")]
pub struct InvalidRoomId;

impl RoomId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidRoomId> {
        let s = s.into();
        if is_valid_room_id(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidRoomId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_room_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_ROOM_ID_LEN
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl TryFrom<String> for RoomId {
    type Error = InvalidRoomId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoomId::parse(value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier assigned by the signaling layer at connection time.
/// Unique per live signaling connection (never reused across reconnects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerHandle(Uuid);

impl PeerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// `{ created_at, peers }`, per §3. Invariant `|peers| ≤ MAX_PEERS_PER_ROOM`
/// is enforced by the registry that owns this value, not by the struct
/// itself.
#[derive(Debug, Clone)]
pub struct Room {
    pub created_at: Instant,
    pub peers: HashSet<PeerHandle>,
}

impl Room {
    pub fn new(created_at: Instant) -> Self {
        Self { created_at, peers: HashSet::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_expired(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// `{ peer, room }`, per §3: a join request awaiting approval, rejection, or
/// disconnect of the requesting peer.
#[derive(Debug, Clone)]
pub struct PendingJoin {
    pub peer: PeerHandle,
    pub room: RoomId,
}
