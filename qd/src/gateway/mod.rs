//! Request gateway
//!
//! The process boundary: newline-delimited JSON over a Unix domain socket.
//! The gateway validates requests against the configured bounds before they
//! reach the coordinator, attaches a delivery timeout proportional to the
//! board size, and formats replies. Every request gets exactly one reply.

mod client;
mod listener;
mod messages;

pub use client::GatewayClient;
pub use listener::{Gateway, cleanup_socket};
pub use messages::{GatewayRequest, GatewayResponse};
