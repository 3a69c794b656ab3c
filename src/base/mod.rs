//! Base types and error handling.
//!
//! Foundational types shared by every layer of the connector stack:
//! - [`neterror::NetError`]: error taxonomy with OS-style integer codes
//! - [`uri::ParsedUri`]: the connector URI model
//! - [`context`]: IO-error-to-[`neterror::NetError`] context helpers

pub mod context;
pub mod neterror;
pub mod uri;
