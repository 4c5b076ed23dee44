pub mod clock;
pub mod config;
pub mod rate;
pub mod room;
pub mod signaling;
pub mod transfer;

pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use config::{IceServer, RuntimeConfig, ServerConfig};
pub use rate::RateState;
pub use room::{InvalidRoomId, PeerHandle, PendingJoin, Room, RoomId, MAX_ROOM_ID_LEN};
pub use signaling::{ClientEvent, ServerEvent, SignalEnvelope};
pub use transfer::{ChunkFrame, ChunkFrameError, FileMetadata, MetadataKind, MIN_CHUNK_FRAME_LEN};
