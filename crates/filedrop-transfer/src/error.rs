//! Failure taxonomy (§7, §9 redesign note 3): a closed set of failure kinds
//! instead of ad-hoc exceptions around channel state.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("negotiation: {0}")]
    Negotiation(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("integrity: expected crc {expected}, got {got}")]
    Integrity { expected: String, got: String },
    #[error("streaming io: {0}")]
    Io(String),
}
