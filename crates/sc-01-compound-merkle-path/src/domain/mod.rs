//! # Domain Layer
//!
//! Pure path construction. No I/O.

pub mod entities;
pub mod offsets;
