//! # CDC Store
//!
//! An in-memory record store that broadcasts every mutation to all
//! connected listeners.
//!
//! ## Core Concepts
//!
//! - **Records**: Opaque payloads under time-ordered generated identifiers
//! - **Change events**: One per successful create, update or delete
//! - **Event queue**: Bounded FIFO; full queue blocks the mutating caller
//! - **Subscribers**: Sinks that are dropped on their first failed delivery
//!
//! ## Example
//!
//! ```ignore
//! use cdc_store::{Store, StoreConfig, SubscriptionConfig};
//!
//! let store = Store::new(StoreConfig::default())?;
//! let feed = store.subscribe(SubscriptionConfig::default())?;
//!
//! let id = store.create(b"hello".to_vec())?;
//! store.update(&id, b"world".to_vec())?;
//! store.delete(&id)?;
//!
//! while let Ok(event) = feed.try_recv() {
//!     println!("{} {}", event.kind, event.id());
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod records;
pub mod service;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod wire;

// Re-exports
pub use auth::{AuthConfig, Authenticator, TokenAuthority, TokenSweeper};
pub use config::ServiceConfig;
pub use error::{Result, StoreError};
pub use events::{EventQueue, PushPermit, DEFAULT_QUEUE_CAPACITY};
pub use gateway::{Gateway, GatewayRequest, GatewayResponse, Method};
pub use records::RecordMap;
pub use service::{CdcService, CrudService};
pub use store::{Store, StoreConfig};
pub use subscriptions::{
    BroadcastStats, ChannelSink, DropReason, EventSink, SinkClosed, SubscriberId,
    SubscriberRegistry, SubscriptionConfig, SubscriptionHandle,
};
pub use types::*;
pub use wire::ListenResponse;
