//! Messenger Platform integration for innkeeper.
//!
//! This crate maps the platform's webhook protocol onto the responder core:
//! - **Wire model** (`wire`) - serde view of the inbound webhook JSON and the
//!   verification handshake query
//! - **Events** (`events`) - typed inbound events, handler trait, dispatcher
//! - **Messages** (`messages`) - outbound message builders (text, button
//!   templates for the webview hand-off)
//! - **Send API** (`send`) - outbound delivery client, fire-and-forget spawn
//!
//! # Architecture
//!
//! ```text
//! Webhook JSON → wire → InboundEvent → EventDispatcher → Handlers
//!                                                           ↓
//!                     Send API ← SendClient ← OutboundMessage
//! ```
//!
//! The dispatcher is pure with respect to I/O: handlers return an
//! [`events::HandlerResult`] and the caller decides whether and how to
//! deliver it. Delivery itself is fire-and-forget via [`send::spawn_send`].

pub mod events;
pub mod messages;
pub mod send;
pub mod wire;
