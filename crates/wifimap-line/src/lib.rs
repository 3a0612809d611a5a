//! LINE Messaging API boundary: webhook signature checks, event parsing,
//! message wire format and the reply client.

pub mod client;
pub mod error;
pub mod message;
mod retry;
pub mod signature;
pub mod webhook;

pub use client::LineClient;
pub use error::LineError;
pub use message::to_wire;
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};
pub use webhook::{parse_events, InboundEvent};
