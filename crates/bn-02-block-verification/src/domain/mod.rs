//! # Domain Layer
//!
//! Hashing, the two tree hashers, results and their completion handle.

pub mod config;
pub mod entities;
pub mod errors;
pub mod future;
pub mod hasher;
pub mod hashing;
pub mod merkle;
