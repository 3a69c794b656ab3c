//! Sockets and transport dialing.
//!
//! - [`stream`]: [`stream::Connection`], endpoints and the stream enum
//! - [`tcp`] / [`unix`]: single-shot transport dialers
//! - [`tls`]: TLS layering over an established transport
//! - [`server`]: pausable server-side listeners

pub mod server;
pub mod stream;
pub mod tcp;
pub mod tls;
pub mod unix;
