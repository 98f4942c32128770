//! Domain module for the lock manager

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
