//! Blocking bounded event queue.

use crate::error::{Result, StoreError};
use crate::types::ChangeEvent;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default number of pending events before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Producer bookkeeping shared by every clone of a queue.
struct Producers {
    closed: AtomicBool,
    in_flight: AtomicUsize,
    /// Signalled when the last permit is released after close.
    idle_tx: Sender<()>,
    idle_rx: Receiver<()>,
}

/// Bounded FIFO of change events.
///
/// `push` blocks while the queue is full, so mutation throughput is bounded
/// by how fast the broadcast loop drains it. Cloning shares the same buffer.
///
/// A producer takes a [`PushPermit`] before applying its mutation. Closing
/// refuses new permits, and the consumer keeps draining until every
/// outstanding permit has pushed or been dropped, so a mutation that was
/// applied always gets its event.
#[derive(Clone)]
pub struct EventQueue {
    sender: Sender<ChangeEvent>,
    receiver: Receiver<ChangeEvent>,
    capacity: usize,
    producers: Arc<Producers>,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` pending events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let (idle_tx, idle_rx) = bounded(1);
        Self {
            sender,
            receiver,
            capacity,
            producers: Arc::new(Producers {
                closed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                idle_tx,
                idle_rx,
            }),
        }
    }

    /// Register an in-flight producer. Fails with `ShutDown` once closed.
    pub fn reserve(&self) -> Result<PushPermit<'_>> {
        // Count first, then check: a consumer that saw no producers after
        // close can never miss one.
        self.producers.in_flight.fetch_add(1, Ordering::SeqCst);
        let permit = PushPermit { queue: self };
        if self.is_closed() {
            return Err(StoreError::ShutDown);
        }
        Ok(permit)
    }

    /// Enqueue an event, blocking while the queue is full.
    pub fn push(&self, event: ChangeEvent) -> Result<()> {
        self.reserve()?.push(event)
    }

    /// Refuse further permits. Events already queued stay poppable.
    pub fn close(&self) {
        self.producers.closed.store(true, Ordering::SeqCst);
        if self.producers() == 0 {
            let _ = self.producers.idle_tx.try_send(());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.producers.closed.load(Ordering::SeqCst)
    }

    /// Dequeue the next event, blocking while the queue is empty.
    pub fn pop(&self) -> Result<ChangeEvent> {
        self.receiver.recv().map_err(|_| StoreError::ShutDown)
    }

    /// Consumer side, for selecting alongside other channels.
    pub(crate) fn receiver(&self) -> &Receiver<ChangeEvent> {
        &self.receiver
    }

    /// Fires after close once no permit is outstanding.
    pub(crate) fn idle(&self) -> &Receiver<()> {
        &self.producers.idle_rx
    }

    /// Permits currently outstanding.
    pub(crate) fn producers(&self) -> usize {
        self.producers.in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sender.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Right to push one event, held across the mutation it describes.
#[must_use = "dropping a permit without pushing emits no event"]
pub struct PushPermit<'a> {
    queue: &'a EventQueue,
}

impl PushPermit<'_> {
    /// Enqueue, blocking while the queue is full.
    ///
    /// Succeeds even if the queue was closed after the permit was taken.
    pub fn push(self, event: ChangeEvent) -> Result<()> {
        self.queue
            .sender
            .send(event)
            .map_err(|_| StoreError::ShutDown)
    }
}

impl Drop for PushPermit<'_> {
    fn drop(&mut self) {
        let producers = &self.queue.producers;
        if producers.in_flight.fetch_sub(1, Ordering::SeqCst) == 1
            && producers.closed.load(Ordering::SeqCst)
        {
            let _ = producers.idle_tx.try_send(());
        }
    }
}
