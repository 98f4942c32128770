//! Ports layer for transaction synchronization.
//!
//! - Inbound (Driving) ports: API exposed to the host process
//! - Outbound (Driven) ports: persistence, chain and paymail collaborators

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
