//! # Error Types
//!
//! Errors shared by every crate that handles transaction entities.

use thiserror::Error;

/// Errors raised while validating or decoding shared entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// A required identifier was empty.
    #[error("Missing identifier: {0}")]
    MissingId(&'static str),

    /// A stored Merkle proof could not be decoded.
    #[error("Invalid merkle proof encoding: {0}")]
    InvalidMerkleProof(String),

    /// An unrecognised status or enum string.
    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },
}
