//! Public-key directory

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use deaddrop_core::UserId;

/// Mapping from user ID to registered public-key record.
///
/// Key records are opaque to the server (JWK blobs in practice) and are
/// stored verbatim. Registration is an unconditional upsert so clients can
/// rotate keys; records are never expired or reaped. That asymmetry with
/// envelope lifetimes is deliberate, but it does mean the directory grows
/// monotonically for the life of the process.
#[derive(Default)]
pub struct KeyDirectory {
    keys: RwLock<HashMap<UserId, serde_json::Value>>,
}

impl KeyDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user's public-key record
    pub fn register(&self, user: UserId, record: serde_json::Value) {
        self.keys.write().insert(user.clone(), record);
        debug!("public key registered for {}", user);
    }

    /// Look up a user's public-key record
    pub fn lookup(&self, user: &UserId) -> Option<serde_json::Value> {
        self.keys.read().get(user).cloned()
    }

    /// Whether the user has a registered key
    pub fn contains(&self, user: &UserId) -> bool {
        self.keys.read().contains_key(user)
    }

    /// Number of registered keys
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_lookup() {
        let dir = KeyDirectory::new();
        let bob = UserId::from("bob");

        assert!(dir.lookup(&bob).is_none());
        assert!(!dir.contains(&bob));

        dir.register(bob.clone(), json!({"kty": "RSA", "n": "abc"}));
        assert!(dir.contains(&bob));
        assert_eq!(dir.lookup(&bob), Some(json!({"kty": "RSA", "n": "abc"})));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_register_overwrites_for_rotation() {
        let dir = KeyDirectory::new();
        let bob = UserId::from("bob");

        dir.register(bob.clone(), json!({"n": "old"}));
        dir.register(bob.clone(), json!({"n": "new"}));

        assert_eq!(dir.lookup(&bob), Some(json!({"n": "new"})));
        assert_eq!(dir.len(), 1);
    }
}
