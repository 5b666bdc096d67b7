//! # Node Runtime Library
//!
//! This library exposes the wiring of the block node for testing.
//! The main entry point is the `main.rs` binary.

pub mod container;

pub use container::{BlockNode, BlockNodeConfig, LiveConsumer};
