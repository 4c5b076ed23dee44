pub mod candidate_queue;
pub mod controller;
pub mod crc;
pub mod error;
pub mod logging;
pub mod ports;
pub mod progress;
pub mod receive;
pub mod send;
pub mod session;

pub use candidate_queue::CandidateQueue;
pub use controller::{Controller, ConnectionState, ControllerEvent, ReportedState, Role};
pub use crc::{crc32, crc32_to_hex};
pub use error::TransferError;
pub use logging::{NullLogger, TracingLogger, TransferEvent, TransferLogger};
pub use ports::{DataChannel, FileBlob, NullPresenter, PeerConnection, Presenter, WritableSink};
pub use progress::ProgressState;
pub use receive::{CompletedArtifact, IngestOutcome, InitOutcome, ReceiveConfig, ReceiveState};
pub use send::{SendConfig, SendOutcome, run_send};
pub use session::{Session, SessionEvent, OFFER_DELAY};
