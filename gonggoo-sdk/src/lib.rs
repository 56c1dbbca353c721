//! Shared types for the gonggoo payments backend.
//!
//! - [`objects`]: request/response bodies of the callable RPC surface and the
//!   inbound payment webhook.
//! - [`signature`]: the HMAC session-token scheme used to authenticate callers.
//! - `client` (feature `client`): a typed HTTP client for the callable API.

#![forbid(unsafe_code)]

pub mod objects;
pub mod signature;

#[cfg(feature = "client")]
pub mod client;
