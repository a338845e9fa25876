//! In-memory record map.
//!
//! Identifiers map to raw payloads behind a single reader/writer lock.
//! Change events are never produced here; the store enqueues them after
//! the lock is released.

mod map;

pub use map::RecordMap;
