//! Application layer for the lock manager

pub mod manager;
