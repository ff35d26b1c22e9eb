//! Identifier and timestamp types used throughout Deaddrop

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier
///
/// Clients generate these at random; the server treats them as opaque
/// strings and never ties them to any real-world identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new random user ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique envelope identifier, assigned at submission time
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeId(String);

impl EnvelopeId {
    /// Create a new random envelope ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EnvelopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp in milliseconds since Unix epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    /// Create from milliseconds
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create from seconds
    pub fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    /// Get as milliseconds
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed since an earlier timestamp.
    ///
    /// Negative if `earlier` is actually in the future; callers comparing
    /// against windows should use signed arithmetic.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }

    /// Get as chrono DateTime
    pub fn as_datetime(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.0).unwrap_or_else(chrono::Utc::now)
    }

    /// Format as RFC 3339 for API responses
    pub fn to_rfc3339(&self) -> String {
        self.as_datetime().to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_datetime().format("%Y-%m-%d %H:%M:%S UTC"))
    }
}
