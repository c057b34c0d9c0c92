//! Redis adapters: the two cross-instance channels.
//!
//! Kept deliberately separate because their contracts differ:
//!
//! - [`stream_bus`] - durable, per-room-ordered, at-least-once fan-out
//!   over Redis Streams (bounded publish retries, resumable reads).
//! - [`pubsub`] - classic PUB/SUB for ephemeral frames: no durability,
//!   no retry, a dropped frame is simply dropped.

mod pubsub;
mod stream_bus;

pub use pubsub::{RedisBroadcast, RedisBroadcastListener};
pub use stream_bus::{RedisEventBus, RedisEventSubscriber, RetryPolicy};
