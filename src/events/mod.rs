//! Bounded FIFO between mutating callers and the broadcast loop.

mod queue;

pub use queue::{EventQueue, PushPermit, DEFAULT_QUEUE_CAPACITY};
