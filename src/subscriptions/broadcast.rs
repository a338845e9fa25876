//! Broadcast loop draining the event queue into the subscriber registry.

use crate::events::EventQueue;
use crate::types::ChangeEvent;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::registry::SubscriberRegistry;
use super::types::DropReason;

/// Counters maintained by the broadcast loop.
#[derive(Debug, Default)]
pub struct BroadcastStats {
    events: AtomicU64,
    deliveries: AtomicU64,
    pruned: AtomicU64,
}

impl BroadcastStats {
    /// Events taken off the queue and fanned out.
    pub fn events_broadcast(&self) -> u64 {
        self.events.load(Ordering::SeqCst)
    }

    /// Successful per-subscriber deliveries.
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::SeqCst)
    }

    /// Subscribers removed after a failed delivery.
    pub fn subscribers_pruned(&self) -> u64 {
        self.pruned.load(Ordering::SeqCst)
    }
}

/// Single consumer of the event queue.
///
/// Each event is offered to every registered subscriber under the registry's
/// shared lock; subscribers that fail are removed afterwards under the
/// exclusive lock and their listeners released.
pub struct BroadcastLoop {
    queue: EventQueue,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<BroadcastStats>,
    shutdown: Receiver<()>,
}

impl BroadcastLoop {
    /// Start the loop on its own thread.
    pub fn spawn(
        queue: EventQueue,
        registry: Arc<SubscriberRegistry>,
    ) -> std::io::Result<BroadcastWorker> {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let stats = Arc::new(BroadcastStats::default());
        let closer = queue.clone();

        let worker = BroadcastLoop {
            queue,
            registry,
            stats: Arc::clone(&stats),
            shutdown: shutdown_rx,
        };

        let handle = thread::Builder::new()
            .name("cdc-broadcast".into())
            .spawn(move || worker.run())?;

        Ok(BroadcastWorker {
            queue: closer,
            shutdown: shutdown_tx,
            handle: Some(handle),
            stats,
        })
    }

    fn run(self) {
        tracing::debug!("broadcast loop started");

        loop {
            select! {
                recv(self.queue.receiver()) -> msg => match msg {
                    Ok(event) => self.broadcast(&event),
                    Err(_) => break,
                },
                recv(self.shutdown) -> _ => break,
            }
        }

        self.drain();

        let released = self.registry.remove_all(DropReason::ShutDown);
        tracing::debug!(released, "broadcast loop stopped");
    }

    /// Deliver what is still queued, including events from producers that
    /// applied their mutation before the queue closed.
    fn drain(&self) {
        loop {
            // Read before draining: once zero, every push has already landed.
            let idle = self.queue.producers() == 0;
            while let Ok(event) = self.queue.receiver().try_recv() {
                self.broadcast(&event);
            }
            if idle {
                return;
            }

            select! {
                recv(self.queue.receiver()) -> msg => {
                    if let Ok(event) = msg {
                        self.broadcast(&event);
                    }
                }
                recv(self.queue.idle()) -> _ => {}
            }
        }
    }

    fn broadcast(&self, event: &ChangeEvent) {
        let delivery = self.registry.deliver(event);

        self.stats
            .deliveries
            .fetch_add(delivery.delivered as u64, Ordering::SeqCst);

        if !delivery.failed.is_empty() {
            let removed = self.registry.remove(&delivery.failed, DropReason::SendFailed);
            self.stats.pruned.fetch_add(removed as u64, Ordering::SeqCst);
            tracing::debug!(
                kind = %event.kind,
                id = %event.id(),
                pruned = removed,
                "dropped failing subscribers"
            );
        }

        // Counted last so observers see pruning already applied.
        self.stats.events.fetch_add(1, Ordering::SeqCst);

        tracing::trace!(
            kind = %event.kind,
            id = %event.id(),
            delivered = delivery.delivered,
            "event broadcast"
        );
    }
}

/// Owner of a running broadcast loop. Stops and joins it on drop.
pub struct BroadcastWorker {
    queue: EventQueue,
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<BroadcastStats>,
}

impl BroadcastWorker {
    pub fn shared_stats(&self) -> Arc<BroadcastStats> {
        Arc::clone(&self.stats)
    }

    /// Close the queue, signal the loop to stop and wait for it.
    ///
    /// Blocks until producers that already hold a permit have pushed and
    /// their events are delivered.
    pub fn stop(&mut self) {
        self.queue.close();
        if let Some(handle) = self.handle.take() {
            let _ = self.shutdown.try_send(());
            if handle.join().is_err() {
                tracing::error!("broadcast loop panicked");
            }
        }
    }
}

impl Drop for BroadcastWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
