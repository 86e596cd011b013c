//! `receptionist-channels` — the narrow boundary between external
//! telephony/SMS/web transports and the conversation core.
//!
//! The core consumes channels only through [`channel::ChannelAdapter`]; this
//! crate deliberately never depends on the orchestrator crate — wiring a
//! concrete adapter to `process_turn` is the gateway binary's job.

pub mod channel;
pub mod error;
pub mod types;
pub mod webhook;

pub use channel::{inbound, ChannelAdapter, TestConsoleAdapter};
pub use error::ChannelError;
pub use types::{ChannelStatus, InboundMessage, OutboundMessage};
