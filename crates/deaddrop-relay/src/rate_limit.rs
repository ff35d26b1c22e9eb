//! Per-client send throttling

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use deaddrop_core::Timestamp;

/// Outcome of a rate-limit check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    /// Send accepted; the client's window has been reset to now
    Allowed,
    /// Send rejected; the client may retry after this long
    Denied {
        /// Remaining wait before the next send will be accepted
        retry_after: Duration,
    },
}

impl RateDecision {
    /// Whether the send was accepted
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

/// Last-accepted-send tracker per client identifier.
///
/// `check` is an atomic check-and-set: the read, the comparison, and the
/// update all happen under one write lock, so two concurrent requests from
/// the same client cannot both pass inside the minimum interval.
pub struct RateLimiter {
    entries: RwLock<HashMap<String, Timestamp>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter with the given minimum interval between sends
    pub fn new(min_interval: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            min_interval,
        }
    }

    /// Check whether a send from `client_id` at `now` is within limits.
    ///
    /// An accepted send records `now` as the client's new window start. A
    /// denied attempt leaves the entry untouched, so hammering the endpoint
    /// does not push the window further out.
    pub fn check(&self, client_id: &str, now: Timestamp) -> RateDecision {
        let min_ms = self.min_interval.as_millis() as i64;
        let mut entries = self.entries.write();

        if let Some(last) = entries.get(client_id) {
            let elapsed = now.millis_since(*last);
            if elapsed < min_ms {
                let retry_after = Duration::from_millis((min_ms - elapsed).max(0) as u64);
                debug!("rate limited {}: retry after {:?}", client_id, retry_after);
                return RateDecision::Denied { retry_after };
            }
        }

        entries.insert(client_id.to_string(), now);
        RateDecision::Allowed
    }

    /// Drop entries whose last accepted send is older than `idle_window`.
    ///
    /// Returns the number of entries reclaimed.
    pub fn sweep(&self, now: Timestamp, idle_window: Duration) -> usize {
        let idle_ms = idle_window.as_millis() as i64;
        let mut entries = self.entries.write();

        let before = entries.len();
        entries.retain(|_, last| now.millis_since(*last) <= idle_ms);
        before - entries.len()
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no clients are currently tracked
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
