//! relay-gateway - HTTP surface for duorelay
//!
//! Serves `POST /chat`, which relays one message to the selected provider,
//! and `GET /api/status`, which reports which providers came up at startup.

pub mod chat;
pub mod protocol;
pub mod server;

pub use protocol::{ChatReply, ChatRequest, ErrorDetail, ModelChoice};
pub use server::RelayServer;
