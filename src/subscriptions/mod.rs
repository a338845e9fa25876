//! Change-data-capture subscriptions.
//!
//! Every successful mutation produces one [`ChangeEvent`](crate::ChangeEvent)
//! which the broadcast loop fans out to all registered subscribers:
//! - Subscribers are opaque [`EventSink`]s plus a one-shot release signal
//! - A failed delivery removes the subscriber and releases its listener
//! - There is no retry and no caller-initiated unsubscribe
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig::default())?;
//!
//! loop {
//!     match handle.recv() {
//!         Ok(event) => println!("{} {}", event.kind, event.id()),
//!         Err(_) => break,
//!     }
//! }
//! ```

mod broadcast;
mod registry;
mod types;

pub use broadcast::{BroadcastLoop, BroadcastStats, BroadcastWorker};
pub use registry::{Delivery, SubscriberRegistry};
pub use types::{
    ChannelSink, DropReason, EventSink, Release, SinkClosed, SubscriberId, SubscriptionConfig,
    SubscriptionHandle,
};
