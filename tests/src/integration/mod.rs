//! End-to-end flows through the public admission API.
//!
//! Every flow drives a `TestNode`: the real service over the in-memory pool
//! and chain, with mock proof verifier, miner and checkpoint source.

pub mod admission_flows;
pub mod block_relay_flows;
pub mod notarization_flows;
