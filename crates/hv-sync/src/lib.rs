//! Haven Sync Protocol
//!
//! Refreshes the crisis-resource allowlist from the server while
//! preserving the engine's fail-safe guarantees. The one rule every path
//! in this crate obeys: nothing a server does can shrink or blank the
//! allowlist. A timeout, a 500, malformed JSON, an empty resource list:
//! all of them leave the cached snapshot exactly as it was.
//!
//! # Modules
//!
//! - `payload`: wire schema, schema validation, and the monotonic merge
//! - `client`: the HTTP client (10 s hard timeout, conditional requests);
//!   behind the `client` feature

pub mod payload;

#[cfg(feature = "client")]
pub mod client;

pub use payload::{
    apply_payload, validate_payload, PayloadOutcome, PayloadValidation, RemoteResource,
};

#[cfg(feature = "client")]
pub use client::{SyncClient, SyncError, SYNC_TIMEOUT};
