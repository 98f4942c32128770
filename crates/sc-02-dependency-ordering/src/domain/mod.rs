//! Domain module for Dependency Ordering
//!
//! Contains the node abstraction, the dependency graph and errors.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
