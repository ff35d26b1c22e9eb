//! Relay facade tying the stores together

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use deaddrop_core::{EnvelopeId, RelayConfig, RelayError, Result, Timestamp, UserId};

use crate::keydir::KeyDirectory;
use crate::mailbox::{EnvelopeView, MailboxStore};
use crate::rate_limit::{RateDecision, RateLimiter};

/// Counters returned by [`Relay::status`]
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RelayStats {
    /// Users with a registered public key
    pub users_with_keys: usize,
    /// Non-empty mailboxes
    pub mailbox_count: usize,
    /// Envelopes currently held, read or not
    pub total_messages: usize,
    /// Configured envelope lifetime, echoed for clients
    pub message_lifetime_secs: u64,
}

/// What one reaper pass evicted
#[derive(Clone, Copy, Debug, Default)]
pub struct SweepReport {
    /// Envelopes removed (read or expired)
    pub envelopes_removed: usize,
    /// Idle rate entries reclaimed
    pub rate_entries_removed: usize,
}

/// The relay core: mailbox store, key directory, and rate limiter behind
/// one façade.
///
/// Each store has its own lock and operations take them strictly one at a
/// time, never nested, so there is no lock ordering to get wrong. All §-level
/// contract semantics (validation order, error signals, sweep rules) live
/// here rather than in the HTTP layer.
pub struct Relay {
    config: RelayConfig,
    mailboxes: MailboxStore,
    keys: KeyDirectory,
    rate: RateLimiter,
}

impl Relay {
    /// Create a relay with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        let rate = RateLimiter::new(config.min_send_interval());
        Self {
            config,
            mailboxes: MailboxStore::new(),
            keys: KeyDirectory::new(),
            rate,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Register or rotate a user's public key
    pub fn register_key(&self, user: UserId, record: serde_json::Value) {
        self.keys.register(user, record);
    }

    /// Fetch a user's public key so a sender can encrypt for them
    pub fn lookup_key(&self, user: &UserId) -> Result<serde_json::Value> {
        self.keys
            .lookup(user)
            .ok_or_else(|| RelayError::KeyNotFound(user.to_string()))
    }

    /// Accept an encrypted envelope for a recipient.
    ///
    /// Validation order: payload size, then recipient existence, then the
    /// rate check-and-set. The rate entry is only written once the send has
    /// passed the other checks, so a rejected submission never counts
    /// against the client's window, and nothing is stored on any failure
    /// path.
    pub fn send_message(
        &self,
        recipient: UserId,
        payload: serde_json::Value,
        sender: Option<UserId>,
        client_id: &str,
        now: Timestamp,
    ) -> Result<EnvelopeId> {
        let size = payload.to_string().len();
        if size > self.config.max_payload_bytes {
            return Err(RelayError::PayloadTooLarge {
                size,
                max: self.config.max_payload_bytes,
            });
        }

        if !self.keys.contains(&recipient) {
            return Err(RelayError::RecipientNotFound(recipient.to_string()));
        }

        if let RateDecision::Denied { retry_after } = self.rate.check(client_id, now) {
            return Err(RelayError::RateLimited { retry_after });
        }

        Ok(self.mailboxes.submit(recipient, payload, sender, now))
    }

    /// Unread envelopes for a user, oldest first; empty if none
    pub fn get_messages(&self, user: &UserId) -> Vec<EnvelopeView> {
        self.mailboxes.fetch_unread(user)
    }

    /// Acknowledge an envelope, scheduling it for the next sweep.
    ///
    /// Fire-and-forget: unknown users or envelope ids are silently ignored.
    pub fn mark_read(&self, user: &UserId, envelope_id: &EnvelopeId) {
        self.mailboxes.mark_read(user, envelope_id);
    }

    /// Snapshot counters plus the lifetime echo
    pub fn status(&self) -> RelayStats {
        let mailbox = self.mailboxes.stats();
        RelayStats {
            users_with_keys: self.keys.len(),
            mailbox_count: mailbox.mailbox_count,
            total_messages: mailbox.envelope_count,
            message_lifetime_secs: self.config.message_lifetime_secs,
        }
    }

    /// One reaper pass over both expiring structures.
    ///
    /// This is the only place deletion happens. It is total: anomalies like
    /// a mailbox drained by a concurrent acknowledge are tolerated because
    /// eviction is idempotent.
    pub fn sweep(&self, now: Timestamp) -> SweepReport {
        let envelopes_removed = self.mailboxes.sweep(now, self.config.message_lifetime());
        let rate_entries_removed = self.rate.sweep(now, self.config.rate_idle_window());

        if envelopes_removed > 0 || rate_entries_removed > 0 {
            info!(
                "sweep evicted {} envelopes, {} idle rate entries",
                envelopes_removed, rate_entries_removed
            );
        }

        SweepReport {
            envelopes_removed,
            rate_entries_removed,
        }
    }

    /// Spawn the background reaper, sweeping every configured interval for
    /// the life of the process.
    pub fn spawn_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let relay = Arc::clone(self);
        let period = relay.config.sweep_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; skip it so a fresh process
            // does not sweep an empty store.
            interval.tick().await;

            loop {
                interval.tick().await;
                let report = relay.sweep(Timestamp::now());
                debug!(
                    "reaper pass complete: {} envelopes, {} rate entries",
                    report.envelopes_removed, report.rate_entries_removed
                );
            }
        })
    }
}
