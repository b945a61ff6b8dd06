//! chatrelay-gateway - HTTP surface for the chat relay
//!
//! Serves the single chat endpoint the frontend posts conversations to,
//! plus a small status endpoint for operators.

pub mod protocol;
pub mod server;

pub use server::{GatewayServer, GatewayState};
