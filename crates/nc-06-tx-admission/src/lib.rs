//! # Transaction Admission Subsystem
//!
//! **Subsystem ID:** 6
//!
//! ## Purpose
//!
//! Gatekeeper between untrusted network input and the pending pool. Takes
//! raw transaction blobs from peers and RPC, verifies them in parallel, and
//! admits the survivors. Also admits partial-signature notarization
//! requests, refreshes external checkpoints, and commits and relays blocks
//! found by the local miner.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Results match submission order | `service/ingestion.rs` - indexed fan-out, order-preserving `collect` |
//! | One mutator at a time | `service/ingestion.rs` - `IngestionGate` owns the pool and storage write ports |
//! | Identity before expansion | `domain/parsed.rs` - `tx_id` hashed in the pre-phase |
//! | A task panic faults one item | `service/ingestion.rs` - `run_isolated` |
//! | Signer slots agree with count and extra | `domain/signers.rs` - `check_consistency` |
//! | Rejection cache stays bounded | `domain/rejection_cache.rs` - two generations of `capacity` |
//! | One checkpoint refresh in flight | `domain/checkpoint.rs` - `AtomicBool` claim |
//! | Committed notarizations retire their requests | `domain/supersession.rs` - prior-hash chain walk under the session |
//!
//! ## Outcomes
//!
//! Per-item results are `AdmissionOutcome` values, never errors. The classic
//! facets are views over the outcome:
//!
//! | Outcome | `verification_failed` | `added_to_pool` |
//! |---------|-----------------------|-----------------|
//! | `Admitted` | no | yes |
//! | `Duplicate` | no | no |
//! | `Gated` | no | no |
//! | `Malformed`, `SemanticFailure`, `CryptoFailure`, `ConsistencyFailure` | yes | no |
//! | `PoolRejected`, `StorageFailure`, `TaskFault` | yes | no |
//!
//! ## Lock Order
//!
//! ```text
//! notarization submission lock ──→ IngestionGate ──→ pool/storage internals
//! ```
//!
//! The rejection cache and the checkpoint flag are independent and never
//! held while acquiring the gate.
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | Block storage | `ChainView`, `ChainCommit` | Dedup, heights, block commit, request metadata |
//! | Pending pool | `PoolView`, `PoolAdmit` | Dedup, admission, found-block assembly |
//! | RingCT verifier | `ProofVerifier` | Proof checks per bundle type |
//! | Network | `RelaySink` | Fire-and-forget relay |
//! | Checkpoints | `CheckpointSource` | Periodic reload on mainnet |
//! | Miner | `MinerControl` | Pause, resume, template refresh |
//! | Supervisor | `IntegritySupervisor` | Process termination on integrity failure |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory pool and chain, channel relay, supervisor │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - TxAdmissionApi trait                       │
//! │  ports/outbound.rs - storage, pool, relay, miner, time traits   │
//! │  service/          - ingestion, notarization, found blocks      │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/outcome.rs         - AdmissionOutcome, contexts         │
//! │  domain/parsed.rs          - blob parsing, key expansion        │
//! │  domain/validator.rs       - semantic and proof checks          │
//! │  domain/signers.rs         - signer slot codec and consistency  │
//! │  domain/supersession.rs    - requests retired by commits        │
//! │  domain/rejection_cache.rs - two-generation rejection memory    │
//! │  domain/checkpoint.rs      - checkpoint refresh guard           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{AdmissionConfig, NetworkType};
pub use domain::*;
pub use error::{AdmissionError, ConfigError, FoundBlockError, Result};
pub use ports::*;
pub use service::{AdmissionDeps, FoundBlockReport, IdleReport, TxAdmissionService};
