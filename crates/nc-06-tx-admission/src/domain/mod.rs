//! Domain layer for the admission subsystem.
//!
//! Pure logic: outcomes, parsing, validation, signer slots, request
//! supersession, the rejection cache and the checkpoint refresh guard.

pub mod checkpoint;
pub mod outcome;
pub mod parsed;
pub mod rejection_cache;
pub mod signers;
pub mod supersession;
pub mod validator;

pub use checkpoint::{CheckpointGuard, RefreshOutcome};
pub use outcome::*;
pub use parsed::{expand_output_keys, parse_blob, ParsedTx, Rejected};
pub use rejection_cache::RejectionCache;
pub use signers::SignerSlots;
pub use supersession::{superseded_requests, PendingRequest};
pub use validator::{SizeLimits, TxValidator, ValidationFailure};
