//! # Ports Layer
//!
//! Collaborators a verification session consumes.

pub mod outbound;
