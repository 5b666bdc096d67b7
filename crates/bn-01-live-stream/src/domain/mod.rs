//! # Domain Layer
//!
//! Live consumer configuration and the errors downstream sinks raise.

pub mod config;
pub mod errors;
