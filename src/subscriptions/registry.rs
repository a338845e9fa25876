//! Registry of live change-feed subscribers.

use crate::types::ChangeEvent;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{DropReason, EventSink, Release, SubscriberId};

/// Internal subscriber state.
struct Subscriber {
    sink: Box<dyn EventSink>,
    /// Sending half of the one-shot release signal.
    release: Sender<DropReason>,
}

impl Subscriber {
    fn release(self, reason: DropReason) {
        // Capacity is 1 and this is the only send, so it cannot be full.
        let _ = self.release.try_send(reason);
    }
}

/// Outcome of one fan-out pass.
#[derive(Debug, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: Vec<SubscriberId>,
}

/// Tracks active subscribers and their release signals.
///
/// Guarded by its own lock, never taken while the record map lock is held.
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a sink. The returned [`Release`] fires when it is removed.
    pub fn register(&self, sink: Box<dyn EventSink>) -> Release {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(1);

        self.subscribers.write().insert(
            id,
            Subscriber {
                sink,
                release: sender,
            },
        );

        tracing::debug!(subscriber = %id, "subscriber registered");
        Release::new(id, receiver)
    }

    /// Remove subscribers and fire their release signals.
    ///
    /// Returns how many were actually registered.
    pub fn remove(&self, ids: &[SubscriberId], reason: DropReason) -> usize {
        if ids.is_empty() {
            return 0;
        }

        let removed: Vec<(SubscriberId, Subscriber)> = {
            let mut subs = self.subscribers.write();
            ids.iter()
                .filter_map(|id| subs.remove(id).map(|sub| (*id, sub)))
                .collect()
        };

        let count = removed.len();
        for (id, sub) in removed {
            tracing::debug!(subscriber = %id, ?reason, "subscriber removed");
            sub.release(reason);
        }
        count
    }

    /// Remove every subscriber.
    pub fn remove_all(&self, reason: DropReason) -> usize {
        let drained: Vec<Subscriber> = self.subscribers.write().drain().map(|(_, s)| s).collect();
        let count = drained.len();
        for sub in drained {
            sub.release(reason);
        }
        count
    }

    /// Offer an event to every subscriber under the shared lock.
    ///
    /// Subscribers whose sink rejected it are reported, not removed, so the
    /// exclusive lock is only taken once per pass.
    pub fn deliver(&self, event: &ChangeEvent) -> Delivery {
        let subs = self.subscribers.read();
        let mut delivery = Delivery::default();
        for (id, sub) in subs.iter() {
            match sub.sink.try_send(event) {
                Ok(()) => delivery.delivered += 1,
                Err(_) => delivery.failed.push(*id),
            }
        }
        delivery
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
