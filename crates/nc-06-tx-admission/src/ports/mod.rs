//! Ports layer for the admission subsystem.
//!
//! - `inbound`: the API the node's network and RPC layers drive
//! - `outbound`: storage, pool, crypto, relay, checkpoint and miner collaborators

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
