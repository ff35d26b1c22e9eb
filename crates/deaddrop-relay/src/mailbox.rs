//! Mailbox store for pending encrypted envelopes

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use deaddrop_core::{EnvelopeId, Timestamp, UserId};

/// One pending message held for a recipient.
///
/// The payload is whatever JSON blob the sender's client produced
/// (ciphertext, nonce, wrapped key); it is stored verbatim and never parsed.
/// `read` is the only field that ever changes, and only ever false → true.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique envelope ID
    pub id: EnvelopeId,
    /// Owning mailbox
    pub recipient: UserId,
    /// Sender, or `None` for full anonymity
    pub sender: Option<UserId>,
    /// Opaque encrypted payload
    pub payload: serde_json::Value,
    /// Submission timestamp
    pub created_at: Timestamp,
    /// Whether the recipient has acknowledged this envelope
    pub read: bool,
}

/// Copy-out view of an unread envelope, as returned to the recipient
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvelopeView {
    /// Envelope ID, used to acknowledge the read
    pub id: EnvelopeId,
    /// Opaque encrypted payload
    pub payload: serde_json::Value,
    /// Submission timestamp
    pub created_at: Timestamp,
    /// Sender, if one was disclosed
    pub sender: Option<UserId>,
}

impl From<&Envelope> for EnvelopeView {
    fn from(env: &Envelope) -> Self {
        Self {
            id: env.id.clone(),
            payload: env.payload.clone(),
            created_at: env.created_at,
            sender: env.sender.clone(),
        }
    }
}

/// Snapshot counters for status reporting
#[derive(Clone, Copy, Debug, Default)]
pub struct MailboxStats {
    /// Number of non-empty mailboxes
    pub mailbox_count: usize,
    /// Total envelopes across all mailboxes, read or not
    pub envelope_count: usize,
}

/// In-memory mapping from recipient to their pending envelopes.
///
/// One lock guards the whole map; every operation holds it for its full
/// critical section, so concurrent submits, fetches, acknowledgements, and
/// sweeps never observe a half-applied mutation. Deletion happens only in
/// [`MailboxStore::sweep`].
#[derive(Default)]
pub struct MailboxStore {
    mailboxes: RwLock<HashMap<UserId, Vec<Envelope>>>,
}

impl MailboxStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new envelope to the recipient's mailbox.
    ///
    /// The mailbox is created on first submission; there is no registration
    /// step at this layer. Returns the generated envelope ID.
    pub fn submit(
        &self,
        recipient: UserId,
        payload: serde_json::Value,
        sender: Option<UserId>,
        now: Timestamp,
    ) -> EnvelopeId {
        let id = EnvelopeId::new();
        let envelope = Envelope {
            id: id.clone(),
            recipient: recipient.clone(),
            sender,
            payload,
            created_at: now,
            read: false,
        };

        self.mailboxes
            .write()
            .entry(recipient.clone())
            .or_default()
            .push(envelope);

        debug!("stored envelope {} for {}", id, recipient);
        id
    }

    /// Snapshot of the recipient's unread envelopes, oldest first.
    ///
    /// Purely a read: `read` flags are untouched, and expiry is not
    /// consulted here (that is the reaper's job), so polling clients can
    /// retry fetches safely up to the lifetime window.
    pub fn fetch_unread(&self, recipient: &UserId) -> Vec<EnvelopeView> {
        let mailboxes = self.mailboxes.read();

        match mailboxes.get(recipient) {
            Some(envelopes) => envelopes
                .iter()
                .filter(|e| !e.read)
                .map(EnvelopeView::from)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Mark an envelope as read, making it eligible for the next sweep.
    ///
    /// A no-op when the recipient or envelope is unknown: the caller cannot
    /// distinguish "already reaped" from "never existed" and should not
    /// need to.
    pub fn mark_read(&self, recipient: &UserId, envelope_id: &EnvelopeId) {
        let mut mailboxes = self.mailboxes.write();

        if let Some(envelopes) = mailboxes.get_mut(recipient) {
            if let Some(envelope) = envelopes.iter_mut().find(|e| &e.id == envelope_id) {
                envelope.read = true;
                debug!("envelope {} marked read", envelope_id);
            }
        }
    }

    /// Evict read and expired envelopes, dropping mailboxes left empty.
    ///
    /// An envelope survives while `read == false` and
    /// `now - created_at <= lifetime` (non-strict, so a submission stamped
    /// exactly `now` is never evicted by a sweep observing the same `now`).
    /// Returns the number of envelopes removed. Never fails.
    pub fn sweep(&self, now: Timestamp, lifetime: Duration) -> usize {
        let lifetime_ms = lifetime.as_millis() as i64;
        let mut mailboxes = self.mailboxes.write();

        let before: usize = mailboxes.values().map(Vec::len).sum();
        mailboxes.retain(|_, envelopes| {
            envelopes.retain(|e| !e.read && now.millis_since(e.created_at) <= lifetime_ms);
            !envelopes.is_empty()
        });
        let after: usize = mailboxes.values().map(Vec::len).sum();

        before - after
    }

    /// Read-only counters for status reporting
    pub fn stats(&self) -> MailboxStats {
        let mailboxes = self.mailboxes.read();
        MailboxStats {
            mailbox_count: mailboxes.len(),
            envelope_count: mailboxes.values().map(Vec::len).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({"encrypted_message": "b64...", "iv": "b64...", "encrypted_key": "b64..."})
    }

    #[test]
    fn test_submit_and_fetch_order() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        let now = Timestamp::from_millis(1_000);

        let id1 = store.submit(bob.clone(), json!({"n": 1}), None, now);
        let id2 = store.submit(bob.clone(), json!({"n": 2}), None, Timestamp::from_millis(2_000));
        let id3 = store.submit(bob.clone(), json!({"n": 3}), None, Timestamp::from_millis(3_000));

        let unread = store.fetch_unread(&bob);
        assert_eq!(unread.len(), 3);
        assert_eq!(unread[0].id, id1);
        assert_eq!(unread[1].id, id2);
        assert_eq!(unread[2].id, id3);
    }

    #[test]
    fn test_fetch_unknown_recipient_is_empty() {
        let store = MailboxStore::new();
        assert!(store.fetch_unread(&UserId::from("nobody")).is_empty());
    }

    #[test]
    fn test_fetch_is_idempotent() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        store.submit(bob.clone(), payload(), None, Timestamp::from_millis(1_000));

        assert_eq!(store.fetch_unread(&bob).len(), 1);
        assert_eq!(store.fetch_unread(&bob).len(), 1);
    }

    #[test]
    fn test_mark_read_excludes_from_fetch() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        let id1 = store.submit(bob.clone(), payload(), None, Timestamp::from_millis(1_000));
        let id2 = store.submit(bob.clone(), payload(), None, Timestamp::from_millis(1_000));

        store.mark_read(&bob, &id1);

        let unread = store.fetch_unread(&bob);
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, id2);

        // Second acknowledgement of the same id is a no-op, not an error
        store.mark_read(&bob, &id1);
        assert_eq!(store.fetch_unread(&bob).len(), 1);
    }

    #[test]
    fn test_mark_read_unknown_is_noop() {
        let store = MailboxStore::new();
        store.mark_read(&UserId::from("nobody"), &EnvelopeId::new());
        assert_eq!(store.stats().mailbox_count, 0);
    }

    #[test]
    fn test_sweep_evicts_read_and_expired() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        let lifetime = Duration::from_secs(600);

        store.submit(bob.clone(), payload(), None, Timestamp::from_millis(0));
        let acked = store.submit(bob.clone(), payload(), None, Timestamp::from_millis(500_000));
        let fresh = store.submit(bob.clone(), payload(), None, Timestamp::from_millis(650_000));
        store.mark_read(&bob, &acked);

        // At t=650s: the first envelope is 650s past creation (> 600s
        // lifetime), `acked` is read, `fresh` was submitted at exactly
        // `now` and must survive.
        let removed = store.sweep(Timestamp::from_millis(650_000), lifetime);
        assert_eq!(removed, 2);

        let unread = store.fetch_unread(&bob);
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, fresh);
    }

    #[test]
    fn test_sweep_keeps_envelope_at_exact_lifetime() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        store.submit(bob.clone(), payload(), None, Timestamp::from_millis(0));

        // now - created_at == lifetime exactly: non-strict comparison keeps it
        let removed = store.sweep(Timestamp::from_millis(600_000), Duration::from_secs(600));
        assert_eq!(removed, 0);
        assert_eq!(store.fetch_unread(&bob).len(), 1);
    }

    #[test]
    fn test_sweep_removes_empty_mailboxes() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        let alice = UserId::from("alice");

        let id = store.submit(bob.clone(), payload(), None, Timestamp::from_millis(1_000));
        store.submit(alice.clone(), payload(), None, Timestamp::from_millis(1_000));
        store.mark_read(&bob, &id);

        assert_eq!(store.stats().mailbox_count, 2);
        store.sweep(Timestamp::from_millis(2_000), Duration::from_secs(600));

        let stats = store.stats();
        assert_eq!(stats.mailbox_count, 1);
        assert_eq!(stats.envelope_count, 1);
    }

    #[test]
    fn test_sweep_on_empty_store() {
        let store = MailboxStore::new();
        assert_eq!(store.sweep(Timestamp::now(), Duration::from_secs(600)), 0);
    }

    #[test]
    fn test_anonymous_sender_preserved() {
        let store = MailboxStore::new();
        let bob = UserId::from("bob");
        store.submit(bob.clone(), payload(), None, Timestamp::from_millis(1_000));
        store.submit(
            bob.clone(),
            payload(),
            Some(UserId::from("alice")),
            Timestamp::from_millis(2_000),
        );

        let unread = store.fetch_unread(&bob);
        assert_eq!(unread[0].sender, None);
        assert_eq!(unread[1].sender, Some(UserId::from("alice")));
    }
}
