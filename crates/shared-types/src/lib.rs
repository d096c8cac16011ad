//! # Shared Types Crate
//!
//! This crate contains the chain entities every Notary-Chain subsystem
//! exchanges, together with the blob codec that turns network bytes into
//! those entities.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Identity before mutation**: `tx_prefix_hash` is a pure function of the
//!   prefix bytes; callers compute it before expanding any RingCT references.
//! - **Strict blobs**: a blob that decodes but leaves trailing bytes is rejected.

pub mod codec;
pub mod entities;
pub mod errors;
pub mod extra;

pub use codec::*;
pub use entities::*;
pub use errors::*;
pub use extra::{parse_extra, signer_index_from_extra, ExtraField};
