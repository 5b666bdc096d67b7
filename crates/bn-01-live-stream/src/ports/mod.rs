//! # Ports Layer
//!
//! - **Inbound (Driving)**: `Notifiable`, how privileged subscribers escalate
//! - **Outbound (Driven)**: `ResponseSender`, where live consumers deliver

pub mod inbound;
pub mod outbound;
