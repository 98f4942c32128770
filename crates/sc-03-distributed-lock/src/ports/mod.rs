//! Ports for the lock manager

pub mod outbound;
