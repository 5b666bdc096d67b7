//! # Node Container
//!
//! Configuration loading and the wiring of every subsystem into one
//! [`BlockNode`].

pub mod config;
pub mod node;

pub use config::BlockNodeConfig;
pub use node::{BlockNode, LiveConsumer};
