//! Main Store struct tying all components together.

use crate::error::{Result, StoreError};
use crate::events::{EventQueue, DEFAULT_QUEUE_CAPACITY};
use crate::records::RecordMap;
use crate::subscriptions::{
    BroadcastLoop, BroadcastStats, BroadcastWorker, ChannelSink, DropReason, EventSink, Release,
    SubscriberRegistry, SubscriptionConfig, SubscriptionHandle,
};
use crate::types::{ChangeEvent, Record, RecordId};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Pending change events before mutating calls block.
    pub queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// The in-memory record store with its change feed.
///
/// Provides a unified interface for:
/// - Create/Read/Update/Delete on opaque payloads
/// - Listening to every mutation as a [`ChangeEvent`]
///
/// Mutations take a queue permit, apply under the record map lock, release
/// it, then enqueue their event. A full queue blocks the mutating caller
/// until the broadcast loop catches up.
pub struct Store {
    config: StoreConfig,

    records: RecordMap,

    events: EventQueue,

    subscribers: Arc<SubscriberRegistry>,

    /// Broadcast loop thread; stopped on shutdown or drop.
    broadcaster: Mutex<BroadcastWorker>,

    stats: Arc<BroadcastStats>,
}

impl Store {
    /// Create a store and start its broadcast loop.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let events = EventQueue::new(config.queue_capacity);
        let subscribers = Arc::new(SubscriberRegistry::new());
        let broadcaster = BroadcastLoop::spawn(events.clone(), Arc::clone(&subscribers))?;

        let stats = broadcaster.shared_stats();

        tracing::debug!(queue_capacity = events.capacity(), "store started");

        Ok(Self {
            config,
            records: RecordMap::new(),
            events,
            subscribers,
            broadcaster: Mutex::new(broadcaster),
            stats,
        })
    }

    // --- Record Operations ---

    /// Store a payload under a freshly generated identifier.
    pub fn create(&self, raw: Vec<u8>) -> Result<RecordId> {
        let permit = self.events.reserve()?;
        tracing::trace!(len = raw.len(), "create");

        let id = RecordId::generate();
        if let Err(e) = self.records.insert_new(id, raw.clone()) {
            tracing::warn!(error = %e, "create failed");
            return Err(e);
        }

        permit.push(ChangeEvent::created(id, raw))?;
        tracing::debug!(%id, "create done");
        Ok(id)
    }

    /// Get the payload stored under `id`.
    pub fn read(&self, id: &RecordId) -> Result<Vec<u8>> {
        tracing::trace!(%id, "read");

        let result = self.records.get(id);
        match &result {
            Ok(_) => tracing::debug!(%id, "read done"),
            Err(e) => tracing::warn!(%id, error = %e, "read failed"),
        }
        result
    }

    /// Replace the payload of an existing record.
    pub fn update(&self, id: &RecordId, raw: Vec<u8>) -> Result<()> {
        let permit = self.events.reserve()?;
        tracing::trace!(%id, len = raw.len(), "update");

        if let Err(e) = self.records.replace(id, raw.clone()) {
            tracing::warn!(%id, error = %e, "update failed");
            return Err(e);
        }

        permit.push(ChangeEvent::updated(*id, raw))?;
        tracing::debug!(%id, "update done");
        Ok(())
    }

    /// Remove a record.
    ///
    /// Deleting an absent identifier is not an error and still emits a
    /// `Deleted` event.
    pub fn delete(&self, id: &RecordId) -> Result<()> {
        let permit = self.events.reserve()?;
        tracing::trace!(%id, "delete");

        let existed = self.records.remove(id);

        permit.push(ChangeEvent::deleted(*id))?;
        tracing::debug!(%id, existed, "delete done");
        Ok(())
    }

    // --- Textual identifier variants ---

    /// `read` with an identifier in text form. Unparseable ids are not found.
    pub fn read_str(&self, id: &str) -> Result<Vec<u8>> {
        let id = Self::parse_id(id)?;
        self.read(&id)
    }

    pub fn update_str(&self, id: &str, raw: Vec<u8>) -> Result<()> {
        let id = Self::parse_id(id)?;
        self.update(&id, raw)
    }

    /// `delete` with an identifier in text form.
    ///
    /// An unparseable id was never stored, but its deletion is announced
    /// like any other, carrying the id exactly as given.
    pub fn delete_str(&self, id: &str) -> Result<()> {
        if let Some(parsed) = RecordId::parse(id) {
            return self.delete(&parsed);
        }

        let permit = self.events.reserve()?;
        permit.push(ChangeEvent::deleted_str(id))?;
        tracing::debug!(id, "delete of malformed id");
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.events.is_closed() {
            Ok(())
        } else {
            Err(StoreError::ShutDown)
        }
    }

    fn parse_id(id: &str) -> Result<RecordId> {
        RecordId::parse(id).ok_or_else(|| StoreError::RecordNotFound(id.to_string()))
    }

    // --- Change Feed ---

    /// Register `sink` and block until it is removed from the registry.
    ///
    /// Removal happens when a delivery to the sink fails, or when the store
    /// shuts down.
    pub fn listen(&self, sink: Box<dyn EventSink>) -> Result<DropReason> {
        self.ensure_running()?;
        let release = self.register(sink);
        tracing::info!(subscriber = %release.id, "listener connected");

        let reason = release.wait();
        tracing::info!(subscriber = %release.id, ?reason, "listener released");
        Ok(reason)
    }

    /// Register a channel-backed subscriber without blocking.
    pub fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle> {
        self.ensure_running()?;
        if config.buffer_size == 0 {
            return Err(StoreError::InvalidConfig(
                "subscription buffer_size must be at least 1".into(),
            ));
        }

        let (sender, receiver) = bounded(config.buffer_size);
        let release = self.register(Box::new(ChannelSink::new(sender)));
        Ok(SubscriptionHandle::new(receiver, release))
    }

    /// Add a sink to the registry, releasing it at once if the store closed
    /// meanwhile and the broadcast loop may already have emptied the registry.
    fn register(&self, sink: Box<dyn EventSink>) -> Release {
        let release = self.subscribers.register(sink);
        if self.events.is_closed() {
            self.subscribers.remove(&[release.id], DropReason::ShutDown);
        }
        release
    }

    // --- Introspection ---

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of every stored record, in no particular order.
    pub fn records(&self) -> Vec<Record> {
        self.records.snapshot()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Change events waiting for the broadcast loop.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn broadcast_stats(&self) -> &BroadcastStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    /// Stop the broadcast loop, releasing every listener.
    ///
    /// Further mutations fail with `ShutDown`. Mutations already under way
    /// complete, and their events are delivered along with everything
    /// queued before listeners are released. Also runs when the store is
    /// dropped.
    pub fn shutdown(&self) {
        if self.events.is_closed() {
            return;
        }
        self.broadcaster.lock().stop();
        tracing::debug!("store shut down");
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.shutdown();
    }
}
