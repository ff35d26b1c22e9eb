//! # Deaddrop Core
//!
//! Core types, errors, and configuration for the Deaddrop relay — a mailbox
//! store for client-encrypted messages.
//!
//! This crate provides:
//! - Identifier and timestamp types
//! - The relay error taxonomy
//! - Runtime configuration with validated defaults
//!
//! The server only ever handles opaque ciphertext: envelopes carry whatever
//! JSON blob the sender's client produced, and nothing here parses it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod types;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use types::{EnvelopeId, Timestamp, UserId};

/// Default envelope lifetime in seconds (10 minutes)
pub const DEFAULT_MESSAGE_LIFETIME_SECS: u64 = 600;

/// Default reaper sweep interval in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default minimum interval between accepted sends per client (seconds)
pub const DEFAULT_MIN_SEND_INTERVAL_SECS: u64 = 5;

/// Default idle window after which a rate entry is reclaimed (1 hour)
pub const DEFAULT_RATE_IDLE_SECS: u64 = 3600;

/// Default maximum serialized payload size in bytes.
///
/// Derived from a ~800-character plaintext budget after encryption and
/// base64 expansion; intentionally loose rather than an exact ciphertext
/// length formula.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 5000;
