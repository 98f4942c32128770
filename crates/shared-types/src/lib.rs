//! # Shared Types Crate
//!
//! Domain entities exchanged between the settlement crates: recorded and
//! incoming transactions, drafts with their paymail destinations, and the
//! Merkle inclusion proof returned by chain queries.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every cross-crate type is defined here.
//! - **Storage Agnostic**: Entities carry no persistence logic; adapters map
//!   them onto whatever backing store they use.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
