//! Bot webhook dispatch
//!
//! One multipart submission per user gesture, one normalized reply back.
//! The dispatcher never interprets reply content beyond routing each
//! present field; transport failures become a single fallback reply.

pub mod client;
pub mod message;
pub mod reply;

pub use client::BotDispatcher;
pub use message::{BotPersona, ChatMode, MessageBody, OutboundMessage};
pub use reply::{BotReply, FALLBACK_TEXT};
