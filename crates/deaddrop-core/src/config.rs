//! Relay configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relay runtime configuration
///
/// All windows are expressed in whole seconds; the accessors convert to
/// [`Duration`] for the code paths that do arithmetic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Envelope lifetime in seconds, measured from submission
    pub message_lifetime_secs: u64,
    /// Reaper sweep interval in seconds
    pub sweep_interval_secs: u64,
    /// Minimum interval between accepted sends per client, in seconds
    pub min_send_interval_secs: u64,
    /// Idle window after which a rate entry is reclaimed, in seconds
    pub rate_idle_secs: u64,
    /// Maximum serialized payload size in bytes
    pub max_payload_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            message_lifetime_secs: crate::DEFAULT_MESSAGE_LIFETIME_SECS,
            sweep_interval_secs: crate::DEFAULT_SWEEP_INTERVAL_SECS,
            min_send_interval_secs: crate::DEFAULT_MIN_SEND_INTERVAL_SECS,
            rate_idle_secs: crate::DEFAULT_RATE_IDLE_SECS,
            max_payload_bytes: crate::DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl RelayConfig {
    /// Get message lifetime as Duration
    pub fn message_lifetime(&self) -> Duration {
        Duration::from_secs(self.message_lifetime_secs)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Get minimum send interval as Duration
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_secs(self.min_send_interval_secs)
    }

    /// Get rate-entry idle window as Duration
    pub fn rate_idle_window(&self) -> Duration {
        Duration::from_secs(self.rate_idle_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.message_lifetime_secs == 0 {
            return Err("message_lifetime_secs must be > 0".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be > 0".to_string());
        }
        if self.max_payload_bytes == 0 {
            return Err("max_payload_bytes must be > 0".to_string());
        }
        if self.rate_idle_secs < self.min_send_interval_secs {
            return Err("rate_idle_secs must be >= min_send_interval_secs".to_string());
        }
        Ok(())
    }
}
