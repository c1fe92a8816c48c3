//! Channel integration tests — multi-threaded producer/consumer behavior,
//! id handoff, and the capacity/FIFO laws.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use threadchan::{registry, Channel, ChannelId, Error, Payload};

// =============================================================================
// Test Helpers
// =============================================================================

/// Encode (producer, seq) as an 8-byte payload.
fn tagged(producer: u32, seq: u32) -> Payload {
    let mut buf = Vec::with_capacity(8);
    buf.extend_from_slice(&producer.to_le_bytes());
    buf.extend_from_slice(&seq.to_le_bytes());
    Payload::from(buf)
}

fn untag(payload: &Payload) -> (u32, u32) {
    let producer = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let seq = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
    (producer, seq)
}

// =============================================================================
// Cross-thread Tests
// =============================================================================

#[test]
fn test_worker_rebuilds_handle_from_raw_id() {
    let chan = Channel::<Payload>::new(4).unwrap();
    let raw: u64 = chan.id().into();

    let worker = thread::spawn(move || {
        let chan = Channel::<Payload>::from_id(raw).unwrap();
        chan.send(&Payload::from("from worker"), false).unwrap();
        chan.ref_count()
    });

    let refs_seen_by_worker = worker.join().unwrap();
    assert_eq!(refs_seen_by_worker, 2);
    assert_eq!(chan.receive(false), Some(Payload::from("from worker")));
    assert_eq!(chan.ref_count(), 1);
}

#[test]
fn test_many_producers_many_consumers_preserve_per_producer_order() {
    const PRODUCERS: u32 = 4;
    const CONSUMERS: usize = 3;
    const MESSAGES: u32 = 500;

    let chan = Channel::<Payload>::new(8).unwrap();
    let id = chan.id();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            thread::spawn(move || {
                let chan = Channel::<Payload>::from_id(id).unwrap();
                let mut last: HashMap<u32, u32> = HashMap::new();
                let mut count = 0u32;
                for payload in &chan {
                    let (producer, seq) = untag(&payload);
                    if let Some(prev) = last.insert(producer, seq) {
                        assert!(seq > prev, "producer {producer} reordered: {prev} then {seq}");
                    }
                    count += 1;
                }
                count
            })
        })
        .collect();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            thread::spawn(move || {
                let chan = Channel::<Payload>::from_id(id).unwrap();
                for seq in 0..MESSAGES {
                    assert!(chan.send(&tagged(p, seq), false).unwrap());
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    chan.close();

    let delivered: u32 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    assert_eq!(delivered, PRODUCERS * MESSAGES);

    let stats = chan.stats();
    assert_eq!(stats.sent, u64::from(PRODUCERS * MESSAGES));
    assert_eq!(stats.received, stats.sent);
    assert_eq!(stats.queued, 0);
    assert!(stats.high_water_mark <= 8);
}

#[test]
fn test_close_releases_every_blocked_sender() {
    let chan = Channel::<Payload>::new(1).unwrap();
    chan.send(&Payload::from("fill"), false).unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let senders: Vec<_> = (0..3)
        .map(|_| {
            let chan = chan.retain();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                chan.send(&Payload::from("blocked"), false)
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(Duration::from_millis(30));
    chan.close();

    for sender in senders {
        let result = sender.join().unwrap();
        assert!(matches!(result, Err(Error::ChannelClosed(_))));
    }
    assert_eq!(chan.receive(false), Some(Payload::from("fill")));
    assert_eq!(chan.receive(false), None);
}

#[test]
fn test_close_releases_every_blocked_receiver() {
    let chan = Channel::<Payload>::new(2).unwrap();
    let receivers: Vec<_> = (0..3)
        .map(|_| {
            let chan = chan.retain();
            thread::spawn(move || chan.receive(false))
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    chan.send(&Payload::from("only one"), false).unwrap();
    chan.close();

    let results: Vec<_> = receivers.into_iter().map(|r| r.join().unwrap()).collect();
    let got: Vec<_> = results.iter().flatten().collect();
    assert_eq!(got, vec![&Payload::from("only one")]);
}

#[test]
fn test_concurrent_release_tears_down_once() {
    let chan = Channel::<Payload>::new(2).unwrap();
    chan.send(&Payload::from("queued"), false).unwrap();
    let id = chan.id();

    let handles: Vec<_> = (0..16).map(|_| chan.retain()).collect();
    chan.release();
    assert!(registry::is_live(id));

    let barrier = Arc::new(Barrier::new(handles.len()));
    let threads: Vec<_> = handles
        .into_iter()
        .map(|h| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.release();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert!(!registry::is_live(id));
    assert!(matches!(
        Channel::<Payload>::from_id(id),
        Err(Error::UnknownChannel(_))
    ));
}

#[test]
fn test_from_id_never_issued() {
    let err = Channel::<Payload>::from_id(ChannelId::from_raw(u64::MAX)).unwrap_err();
    assert_eq!(err.kind(), "UNKNOWN_CHANNEL");
}

#[test]
fn test_stats_serialize_to_json() {
    let chan = Channel::<Payload>::new(3).unwrap();
    chan.send(&Payload::from("x"), false).unwrap();

    let json = serde_json::to_value(chan.stats()).unwrap();
    assert_eq!(json["id"], serde_json::json!(chan.id().as_u64()));
    assert_eq!(json["capacity"], serde_json::json!(3));
    assert_eq!(json["queued"], serde_json::json!(1));
    assert_eq!(json["closed"], serde_json::json!(false));
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_exactly_capacity_immediate_sends(capacity in 1usize..64) {
        let chan = Channel::<Payload>::new(capacity).unwrap();
        let p = Payload::from("p");
        for _ in 0..capacity {
            prop_assert!(chan.send(&p, true).unwrap());
        }
        prop_assert!(!chan.send(&p, true).unwrap());
        prop_assert_eq!(chan.len(), capacity);
    }

    #[test]
    fn prop_fifo_order(items in proptest::collection::vec(any::<Vec<u8>>(), 1..32)) {
        let chan = Channel::<Payload>::new(items.len()).unwrap();
        let sent: Vec<Payload> = items.into_iter().map(Payload::from).collect();
        for p in &sent {
            prop_assert!(chan.send(p, true).unwrap());
        }

        let mut received = Vec::new();
        while let Some(p) = chan.receive(true) {
            received.push(p);
        }
        prop_assert_eq!(received.len(), sent.len());
        for (got, want) in received.iter().zip(&sent) {
            prop_assert!(got.same_storage(want));
        }
    }

    #[test]
    fn prop_interleaved_ops_match_model(ops in proptest::collection::vec(any::<bool>(), 1..200), capacity in 1usize..8) {
        // true = immediate send, false = immediate receive
        let chan = Channel::<Payload>::new(capacity).unwrap();
        let mut model = std::collections::VecDeque::new();
        let mut next = 0u32;

        for op in ops {
            if op {
                let p = tagged(0, next);
                let accepted = chan.send(&p, true).unwrap();
                prop_assert_eq!(accepted, model.len() < capacity);
                if accepted {
                    model.push_back(p);
                    next += 1;
                }
            } else {
                prop_assert_eq!(chan.receive(true), model.pop_front());
            }
            prop_assert_eq!(chan.len(), model.len());
            prop_assert_eq!(chan.is_full(), model.len() == capacity);
            prop_assert_eq!(chan.is_empty(), model.is_empty());
        }
    }

    #[test]
    fn prop_close_then_drain(k in 0usize..16, extra in 1usize..4) {
        let chan = Channel::<Payload>::new(k + extra).unwrap();
        for i in 0..k {
            chan.send(&tagged(1, i as u32), false).unwrap();
        }
        chan.close();

        for i in 0..k {
            prop_assert_eq!(chan.receive(false), Some(tagged(1, i as u32)));
        }
        prop_assert_eq!(chan.receive(false), None);
        prop_assert_eq!(chan.receive(true), None);
    }
}
