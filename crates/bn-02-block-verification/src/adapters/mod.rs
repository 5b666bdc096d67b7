//! # Adapters
//!
//! - `handler`: the verification feed subscribed to the mediator
//! - `item_hasher`: SHA-384 leaf hashing of block items
//! - `signature`: `SignatureVerifier` implementations

pub mod handler;
pub mod item_hasher;
pub mod signature;
