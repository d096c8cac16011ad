//! Adapters layer for the admission subsystem.
//!
//! Implementations of the outbound ports used by tests, local regression
//! chains and the node binary's relay and supervisor wiring.

pub mod memory_chain;
pub mod memory_pool;
pub mod relay;
pub mod supervisor;

pub use memory_chain::MemoryChain;
pub use memory_pool::MemoryPool;
pub use relay::ChannelRelay;
pub use supervisor::AbortSupervisor;
