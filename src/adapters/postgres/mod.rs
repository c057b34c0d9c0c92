//! PostgreSQL adapters.
//!
//! The database is the synchronization point between gateway instances:
//! correctness relies on its write atomicity, not on application-level
//! locking. Both adapters are thin - one statement per operation, upserts
//! for everything append-only.

mod message_store;
mod room_directory;

pub use message_store::PostgresMessageStore;
pub use room_directory::PostgresRoomDirectory;
