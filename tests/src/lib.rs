//! # Notary-Chain Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks
//! │   └── admission_benchmarks.rs
//! └── src/
//!     └── integration/  # End-to-end admission flows
//!         ├── admission_flows.rs
//!         ├── notarization_flows.rs
//!         └── block_relay_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p nc-tests
//! cargo test -p nc-tests integration::notarization_flows
//! cargo bench -p nc-tests
//! ```

pub mod integration;
