//! End-to-end exercises of the relay core

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;

use deaddrop_core::{RelayConfig, Timestamp, UserId};
use deaddrop_relay::{MailboxStore, Relay};

fn payload(n: u64) -> serde_json::Value {
    json!({
        "encrypted_message": format!("ciphertext-{n}"),
        "iv": "aXYtYnl0ZXM=",
        "encrypted_key": "d3JhcHBlZC1rZXk=",
    })
}

#[test]
fn anonymous_message_lifecycle() {
    let relay = Relay::new(RelayConfig::default());
    let bob = UserId::from("bob");

    relay.register_key(bob.clone(), json!({"kty": "RSA", "n": "bob-modulus"}));

    let id = relay
        .send_message(bob.clone(), payload(1), None, "9.9.9.9", Timestamp::from_millis(1_000))
        .expect("send to registered recipient");

    let messages = relay.get_messages(&bob);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, id);
    assert_eq!(messages[0].sender, None);
    assert_eq!(messages[0].payload, payload(1));

    relay.mark_read(&bob, &id);
    assert!(relay.get_messages(&bob).is_empty());

    // The envelope lingers until a sweep actually evicts it.
    assert_eq!(relay.status().total_messages, 1);
    relay.sweep(Timestamp::from_millis(2_000));
    assert_eq!(relay.status().total_messages, 0);
    assert_eq!(relay.status().mailbox_count, 0);
}

#[test]
fn messages_arrive_in_insertion_order_across_senders() {
    let relay = Relay::new(RelayConfig::default());
    let bob = UserId::from("bob");
    relay.register_key(bob.clone(), json!({"kty": "RSA"}));

    // Distinct client ids so the per-client limiter does not interleave.
    for n in 0..5u64 {
        relay
            .send_message(
                bob.clone(),
                payload(n),
                Some(UserId::from(format!("sender-{n}").as_str())),
                &format!("10.0.0.{n}"),
                Timestamp::from_millis(1_000 + n as i64),
            )
            .unwrap();
    }

    let messages = relay.get_messages(&bob);
    assert_eq!(messages.len(), 5);
    for (n, view) in messages.iter().enumerate() {
        assert_eq!(view.payload, payload(n as u64));
    }
}

#[test]
fn concurrent_submits_lose_nothing() {
    const CALLERS: usize = 16;
    const PER_CALLER: usize = 25;

    let store = Arc::new(MailboxStore::new());
    let bob = UserId::from("bob");

    let handles: Vec<_> = (0..CALLERS)
        .map(|c| {
            let store = Arc::clone(&store);
            let bob = bob.clone();
            thread::spawn(move || {
                (0..PER_CALLER)
                    .map(|n| {
                        store.submit(
                            bob.clone(),
                            payload((c * PER_CALLER + n) as u64),
                            None,
                            Timestamp::now(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("submitter thread panicked") {
            ids.insert(id);
        }
    }

    assert_eq!(ids.len(), CALLERS * PER_CALLER);
    let stats = store.stats();
    assert_eq!(stats.mailbox_count, 1);
    assert_eq!(stats.envelope_count, CALLERS * PER_CALLER);
}

#[test]
fn sweep_races_cleanly_with_submits() {
    let store = Arc::new(MailboxStore::new());
    let bob = UserId::from("bob");
    let lifetime = Duration::from_secs(600);

    let writer = {
        let store = Arc::clone(&store);
        let bob = bob.clone();
        thread::spawn(move || {
            for n in 0..200u64 {
                store.submit(bob.clone(), payload(n), None, Timestamp::now());
            }
        })
    };

    let sweeper = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                // Fresh envelopes carry created_at == now and survive the
                // non-strict comparison, so a concurrent sweep evicts nothing.
                store.sweep(Timestamp::now(), lifetime);
            }
        })
    };

    writer.join().unwrap();
    sweeper.join().unwrap();

    assert_eq!(store.stats().envelope_count, 200);
}

#[test]
fn unacknowledged_messages_survive_until_lifetime() {
    let mut config = RelayConfig::default();
    config.message_lifetime_secs = 10;
    let relay = Relay::new(config);

    let bob = UserId::from("bob");
    relay.register_key(bob.clone(), json!({"kty": "RSA"}));
    relay
        .send_message(bob.clone(), payload(1), None, "9.9.9.9", Timestamp::from_millis(0))
        .unwrap();

    // Repeated polls inside the lifetime keep returning the envelope.
    relay.sweep(Timestamp::from_millis(5_000));
    assert_eq!(relay.get_messages(&bob).len(), 1);
    relay.sweep(Timestamp::from_millis(10_000));
    assert_eq!(relay.get_messages(&bob).len(), 1);

    // One past the lifetime it is gone without any acknowledgement.
    relay.sweep(Timestamp::from_millis(10_001));
    assert!(relay.get_messages(&bob).is_empty());
}

#[tokio::test(start_paused = true)]
async fn reaper_task_sweeps_on_interval() {
    let mut config = RelayConfig::default();
    config.sweep_interval_secs = 60;
    config.message_lifetime_secs = 1;

    let relay = Arc::new(Relay::new(config));
    let bob = UserId::from("bob");
    relay.register_key(bob.clone(), json!({"kty": "RSA"}));
    relay
        .send_message(bob.clone(), payload(1), None, "9.9.9.9", Timestamp::from_millis(0))
        .unwrap();

    let handle = relay.spawn_reaper();

    // Two paused-clock intervals are plenty for at least one pass over an
    // envelope whose wall-clock lifetime has long expired.
    tokio::time::sleep(Duration::from_secs(121)).await;

    assert_eq!(relay.status().total_messages, 0);
    handle.abort();
}
