//! Lock backend adapters

pub mod memory;
