//! # Deaddrop Relay
//!
//! The core of the Deaddrop message relay: an in-memory, self-expiring
//! mailbox store for client-encrypted envelopes.
//!
//! ## Components
//!
//! - **Mailbox Store**: per-recipient ordered collections of pending
//!   envelopes, insertion order preserved
//! - **Key Directory**: opaque public-key records, upsert-only
//! - **Rate Limiter**: last-accepted-send tracking per client
//! - **Reaper**: periodic sweep evicting read/expired envelopes and stale
//!   rate entries
//!
//! Envelopes are ciphertext blobs produced by the sender's client; nothing
//! in this crate can decrypt them. State lives only in memory and does not
//! survive a restart.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod keydir;
pub mod mailbox;
pub mod rate_limit;
pub mod relay;

pub use keydir::KeyDirectory;
pub use mailbox::{Envelope, EnvelopeView, MailboxStats, MailboxStore};
pub use rate_limit::{RateDecision, RateLimiter};
pub use relay::{Relay, RelayStats, SweepReport};
