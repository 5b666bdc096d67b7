//! # Shared Types Crate
//!
//! Types shared by every block node crate.
//!
//! ## Contents
//!
//! - **Entities**: `BlockItem`, `BlockHeader`, `BlockProof`, `BlockItemBatch`
//!   and the fixed-length `Hash` used for every leaf and root.
//! - **Service status**: the explicit "accepting / not accepting" flag that the
//!   publish path and the verification engine share.
//! - **Clock**: injectable millisecond clock used by liveness checks.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod status;

pub use clock::{Clock, SystemClock};
pub use entities::*;
pub use errors::*;
pub use status::ServiceStatus;
