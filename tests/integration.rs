//! Integration tests for the store and its change feed.

use cdc_store::{
    ChangeEvent, ChangeKind, DropReason, RecordId, SinkClosed, Store, StoreConfig,
    SubscriptionConfig,
};
use crossbeam_channel::unbounded;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

fn test_store() -> Store {
    Store::new(StoreConfig::default()).unwrap()
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

// --- Realistic Workflow Tests ---

#[test]
fn test_full_lifecycle_with_listener() {
    let store = test_store();
    let feed = store.subscribe(SubscriptionConfig::default()).unwrap();

    let id = store.create(vec![1, 2, 3]).unwrap();
    assert_eq!(store.read(&id).unwrap(), vec![1, 2, 3]);

    store.update(&id, vec![4, 5]).unwrap();
    assert_eq!(store.read(&id).unwrap(), vec![4, 5]);

    store.delete(&id).unwrap();
    assert!(store.read(&id).unwrap_err().is_not_found());

    let events: Vec<ChangeEvent> = (0..3).map(|_| feed.recv_timeout(TIMEOUT).unwrap()).collect();
    assert_eq!(
        events,
        vec![
            ChangeEvent::created(id, vec![1, 2, 3]),
            ChangeEvent::updated(id, vec![4, 5]),
            ChangeEvent::deleted(id),
        ]
    );

    // Exactly three, nothing else
    assert!(feed.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_every_subscriber_sees_every_event() {
    let store = test_store();
    let feeds: Vec<_> = (0..4)
        .map(|_| store.subscribe(SubscriptionConfig::default()).unwrap())
        .collect();

    let ids: Vec<RecordId> = (0..20u8).map(|i| store.create(vec![i]).unwrap()).collect();

    for feed in &feeds {
        let seen: Vec<RecordId> = (0..ids.len())
            .map(|_| feed.recv_timeout(TIMEOUT).unwrap().record_id().unwrap())
            .collect();
        assert_eq!(seen, ids);
    }
}

#[test]
fn test_late_subscriber_misses_earlier_events() {
    let store = test_store();
    let early = store.subscribe(SubscriptionConfig::default()).unwrap();

    let first = store.create(vec![1]).unwrap();
    // Make sure the first event has been fanned out before subscribing
    assert_eq!(early.recv_timeout(TIMEOUT).unwrap().record_id().unwrap(), first);

    let late = store.subscribe(SubscriptionConfig::default()).unwrap();
    let second = store.create(vec![2]).unwrap();

    assert_eq!(late.recv_timeout(TIMEOUT).unwrap().record_id().unwrap(), second);
    assert_eq!(early.recv_timeout(TIMEOUT).unwrap().record_id().unwrap(), second);
}

#[test]
fn test_delete_missing_still_notifies() {
    let store = test_store();
    let feed = store.subscribe(SubscriptionConfig::default()).unwrap();

    let id = RecordId::generate();
    store.delete(&id).unwrap();

    let event = feed.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(event.kind, ChangeKind::Deleted);
    assert_eq!(event.record_id().unwrap(), id);
}

// --- Concurrency ---

#[test]
fn test_concurrent_creates_are_unique() {
    let store = Arc::new(test_store());
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..per_thread)
                    .map(|i| store.create(format!("{}-{}", t, i).into_bytes()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: HashSet<RecordId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(ids.len(), threads * per_thread);
    assert_eq!(store.len(), threads * per_thread);
}

#[test]
fn test_concurrent_mutations_reach_subscriber_once_each() {
    let store = Arc::new(test_store());
    let feed = store
        .subscribe(SubscriptionConfig { buffer_size: 10_000 })
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50u8 {
                    let id = store.create(vec![i]).unwrap();
                    store.update(&id, vec![i, i]).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut created = HashSet::new();
    let mut updated = HashSet::new();
    for _ in 0..400 {
        let event = feed.recv_timeout(TIMEOUT).unwrap();
        let id = event.record_id().unwrap();
        match event.kind {
            ChangeKind::Created => {
                assert!(!updated.contains(&id), "update seen before create");
                assert!(created.insert(id));
            }
            ChangeKind::Updated => assert!(updated.insert(id)),
            ChangeKind::Deleted => panic!("unexpected delete"),
        }
    }
    assert_eq!(created, updated);
    assert!(feed.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_slow_broadcast_applies_backpressure() {
    let store = Arc::new(Store::new(StoreConfig { queue_capacity: 1 }).unwrap());
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);

    // Sink that blocks the broadcast loop until the gate opens.
    let listener = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            store.listen(Box::new(move |_: &ChangeEvent| -> Result<(), SinkClosed> {
                let _ = gate_rx.recv();
                Ok(())
            }))
        })
    };
    wait_until(|| store.subscriber_count() == 1);

    let done = Arc::new(AtomicUsize::new(0));
    let producer = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..3u8 {
                store.create(vec![i]).unwrap();
                done.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    // One event held by the sink, one in the queue, third create blocked.
    wait_until(|| done.load(Ordering::SeqCst) == 2);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(done.load(Ordering::SeqCst), 2);

    for _ in 0..3 {
        gate_tx.send(()).unwrap();
    }
    producer.join().unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 3);

    drop(gate_tx);
    store.shutdown();
    assert_eq!(listener.join().unwrap().unwrap(), DropReason::ShutDown);
}

// --- Listener Lifecycle ---

#[test]
fn test_listen_blocks_until_delivery_fails() {
    let store = Arc::new(test_store());
    let (tx, rx) = unbounded();
    let budget = Arc::new(AtomicUsize::new(2));

    // Accepts two events, then reports a closed connection.
    let listener = {
        let store = Arc::clone(&store);
        let budget = Arc::clone(&budget);
        thread::spawn(move || {
            store.listen(Box::new(move |event: &ChangeEvent| {
                if budget.load(Ordering::SeqCst) == 0 {
                    return Err(SinkClosed);
                }
                budget.fetch_sub(1, Ordering::SeqCst);
                tx.send(event.record_id().unwrap()).map_err(|_| SinkClosed)
            }))
        })
    };
    wait_until(|| store.subscriber_count() == 1);

    let a = store.create(vec![1]).unwrap();
    let b = store.create(vec![2]).unwrap();
    assert!(!listener.is_finished());

    store.create(vec![3]).unwrap();
    let reason = listener.join().unwrap().unwrap();

    assert_eq!(reason, DropReason::SendFailed);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_severed_subscriber_removed_before_next_broadcast() {
    let store = test_store();
    let healthy = store.subscribe(SubscriptionConfig::default()).unwrap();
    let severed = store.subscribe(SubscriptionConfig::default()).unwrap();
    assert_eq!(store.subscriber_count(), 2);

    drop(severed);
    let first = store.create(vec![1]).unwrap();
    assert_eq!(healthy.recv_timeout(TIMEOUT).unwrap().record_id().unwrap(), first);

    // Second event is broadcast to the healthy subscriber only.
    let second = store.create(vec![2]).unwrap();
    assert_eq!(healthy.recv_timeout(TIMEOUT).unwrap().record_id().unwrap(), second);
    wait_until(|| store.broadcast_stats().events_broadcast() == 2);

    assert_eq!(store.subscriber_count(), 1);
    assert_eq!(store.broadcast_stats().subscribers_pruned(), 1);
    assert_eq!(store.broadcast_stats().deliveries(), 2);
}

#[test]
fn test_overflowing_subscriber_is_dropped() {
    let store = test_store();
    let slow = store.subscribe(SubscriptionConfig { buffer_size: 2 }).unwrap();

    for i in 0..5u8 {
        store.create(vec![i]).unwrap();
    }
    assert_eq!(slow.wait_released(TIMEOUT), Some(DropReason::SendFailed));
    assert_eq!(store.subscriber_count(), 0);

    // Buffered events before the overflow are still readable
    assert!(slow.try_recv().is_ok());
    assert!(slow.try_recv().is_ok());
}

#[test]
fn test_shutdown_releases_blocked_listener() {
    let store = Arc::new(test_store());
    let listener = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            store.listen(Box::new(|_: &ChangeEvent| -> Result<(), SinkClosed> {
                Ok(())
            }))
        })
    };
    wait_until(|| store.subscriber_count() == 1);

    store.shutdown();
    assert_eq!(listener.join().unwrap().unwrap(), DropReason::ShutDown);
}
