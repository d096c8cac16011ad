//! # Shared Crypto - Hashing and Curve Checks
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Transaction/block identity, blob hashes |
//! | `keys` | Ed25519 (curve25519) | Output key validity, key-image subgroup checks |
//!
//! ## Security Properties
//!
//! - **Keccak-256**: original (pre-NIST padding) Keccak, the CryptoNote "fast hash"
//! - **Key images**: must decompress AND lie in the prime-order subgroup;
//!   a key image carrying a torsion component would let one output be spent
//!   under several distinct key images.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hashing;
pub mod keys;

// Re-exports
pub use hashing::{keccak256, keccak256_many, Hash, KeccakHasher};
pub use keys::{check_key_image, is_valid_point, public_key_from_secret, KeyImageCheck};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
