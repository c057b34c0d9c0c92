//! Ports - trait boundaries between the delivery core and its adapters.
//!
//! Each port is an explicit handle constructed once at process start and
//! passed into the components that need it; no ambient singletons.

mod broadcast;
mod event_bus;
mod identity;
mod media;
mod message_store;
mod room_directory;

pub use broadcast::BroadcastPublisher;
pub use event_bus::{ChatEventHandler, EventPublisher, RoomEventHandler};
pub use identity::IdentityValidator;
pub use media::MediaStorage;
pub use message_store::MessageStore;
pub use room_directory::RoomDirectory;
