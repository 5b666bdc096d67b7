//! # Block Node Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── live_stream.rs    # Mediator fan-out, pacing, live consumers
//!     └── verification.rs   # Verification feed riding on the mediator
//!
//! tests/benches/
//! └── tree_hasher_benchmarks.rs   # Sequential vs parallel tree hashing
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bn-tests
//! cargo test -p bn-tests integration::verification::
//! cargo bench -p bn-tests
//! ```

pub mod integration;
