//! Subscription types for the change feed.

use crate::types::ChangeEvent;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Configuration for a channel-backed subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before the subscriber counts as failed.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// Unique identifier for a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Returned by a sink that can no longer accept events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sink closed")]
pub struct SinkClosed;

/// Destination for change events belonging to one subscriber.
///
/// Implementations must not block: a sink that cannot take the event right
/// now reports `SinkClosed` and is dropped by the broadcast loop.
pub trait EventSink: Send + Sync {
    fn try_send(&self, event: &ChangeEvent) -> Result<(), SinkClosed>;
}

impl<F> EventSink for F
where
    F: Fn(&ChangeEvent) -> Result<(), SinkClosed> + Send + Sync,
{
    fn try_send(&self, event: &ChangeEvent) -> Result<(), SinkClosed> {
        self(event)
    }
}

/// Sink backed by a bounded channel. A full buffer counts as closed.
pub struct ChannelSink {
    sender: Sender<ChangeEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<ChangeEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn try_send(&self, event: &ChangeEvent) -> Result<(), SinkClosed> {
        match self.sender.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SinkClosed),
            Err(TrySendError::Disconnected(_)) => Err(SinkClosed),
        }
    }
}

/// Why a subscriber was released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// A delivery attempt failed (closed connection, full buffer).
    SendFailed,
    /// The store shut down.
    ShutDown,
}

/// One-shot release signal for a registered subscriber.
///
/// Fires exactly once, when the registry removes the subscriber.
pub struct Release {
    pub id: SubscriberId,
    receiver: Receiver<DropReason>,
}

impl Release {
    pub(crate) fn new(id: SubscriberId, receiver: Receiver<DropReason>) -> Self {
        Self { id, receiver }
    }

    /// Block until the subscriber is removed.
    pub fn wait(&self) -> DropReason {
        // A dropped sender without a reason means the registry went away.
        self.receiver.recv().unwrap_or(DropReason::ShutDown)
    }

    /// Block until removed or the timeout elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<DropReason> {
        match self.receiver.recv_timeout(timeout) {
            Ok(reason) => Some(reason),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(DropReason::ShutDown),
        }
    }
}

/// Handle to a channel-backed subscription.
///
/// Dropping the handle disconnects the channel; the subscriber is pruned on
/// the next broadcast.
pub struct SubscriptionHandle {
    pub id: SubscriberId,
    /// Channel to receive events.
    pub receiver: Receiver<ChangeEvent>,
    release: Release,
}

impl SubscriptionHandle {
    pub(crate) fn new(receiver: Receiver<ChangeEvent>, release: Release) -> Self {
        Self {
            id: release.id,
            receiver,
            release,
        }
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ChangeEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ChangeEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ChangeEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Wait until the registry drops this subscriber.
    pub fn wait_released(&self, timeout: Duration) -> Option<DropReason> {
        self.release.wait_timeout(timeout)
    }
}
