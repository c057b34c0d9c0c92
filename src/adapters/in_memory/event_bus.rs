//! In-memory event bus.
//!
//! Publishing dispatches synchronously, in publish order, to every
//! registered handler - which is exactly the per-room ordering guarantee
//! the production stream gives, with zero latency. Handler errors are
//! logged and isolated, as in the production subscriber loop.

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::domain::{ChatError, ChatEvent, RoomEvent};
use crate::ports::{ChatEventHandler, EventPublisher, RoomEventHandler};

pub struct InMemoryEventBus {
    chat_handlers: RwLock<Vec<Arc<dyn ChatEventHandler>>>,
    room_handlers: RwLock<Vec<Arc<dyn RoomEventHandler>>>,
    published: Mutex<Vec<ChatEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            chat_handlers: RwLock::new(Vec::new()),
            room_handlers: RwLock::new(Vec::new()),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Registers a consumer for message-sent facts.
    pub fn subscribe_chat(&self, handler: Arc<dyn ChatEventHandler>) {
        self.chat_handlers
            .write()
            .expect("handler registry poisoned")
            .push(handler);
    }

    /// Registers a consumer for room-creation facts.
    pub fn subscribe_room(&self, handler: Arc<dyn RoomEventHandler>) {
        self.room_handlers
            .write()
            .expect("handler registry poisoned")
            .push(handler);
    }

    /// Injects a room event as the external collaborator would.
    pub async fn emit_room(&self, event: RoomEvent) {
        let handlers = self
            .room_handlers
            .read()
            .expect("handler registry poisoned")
            .clone();
        for handler in handlers {
            if let Err(err) = handler.handle(event.clone()).await {
                tracing::warn!(handler = handler.name(), "Room event handler failed: {}", err);
            }
        }
    }

    /// Redelivers an already-published event, simulating the at-least-once
    /// transport.
    pub async fn redeliver(&self, event: ChatEvent) {
        self.dispatch_chat(event).await;
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<ChatEvent> {
        self.published.lock().expect("publish log poisoned").clone()
    }

    pub fn event_count(&self) -> usize {
        self.published.lock().expect("publish log poisoned").len()
    }

    async fn dispatch_chat(&self, event: ChatEvent) {
        let handlers = self
            .chat_handlers
            .read()
            .expect("handler registry poisoned")
            .clone();
        for handler in handlers {
            if let Err(err) = handler.handle(event.clone()).await {
                tracing::warn!(handler = handler.name(), "Chat event handler failed: {}", err);
            }
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &ChatEvent) -> Result<(), ChatError> {
        self.published
            .lock()
            .expect("publish log poisoned")
            .push(event.clone());
        self.dispatch_chat(event.clone()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, MessageId, MessageKind, RoomId, Timestamp, UserId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: AtomicUsize,
    }

    #[async_trait]
    impl ChatEventHandler for CountingHandler {
        async fn handle(&self, _event: ChatEvent) -> Result<(), ChatError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    fn sample_event() -> ChatEvent {
        let message = Message {
            id: MessageId::new(),
            room_id: RoomId::parse("room_a_b").unwrap(),
            sender_id: UserId::new("1").unwrap(),
            sender_name: "A".to_string(),
            content: "x".to_string(),
            kind: MessageKind::Text,
            timestamp: Timestamp::now(),
        };
        ChatEvent::from_message(&message, None)
    }

    #[tokio::test]
    async fn publish_dispatches_to_subscribers() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(CountingHandler {
            count: AtomicUsize::new(0),
        });
        bus.subscribe_chat(handler.clone());

        bus.publish(&sample_event()).await.unwrap();
        bus.publish(&sample_event()).await.unwrap();

        assert_eq!(handler.count.load(Ordering::SeqCst), 2);
        assert_eq!(bus.event_count(), 2);
    }

    /// Handler failure must not poison the bus for other handlers.
    struct FailingHandler;

    #[async_trait]
    impl ChatEventHandler for FailingHandler {
        async fn handle(&self, _event: ChatEvent) -> Result<(), ChatError> {
            Err(ChatError::transport("boom"))
        }

        fn name(&self) -> &'static str {
            "FailingHandler"
        }
    }

    #[tokio::test]
    async fn failing_handler_is_isolated() {
        let bus = InMemoryEventBus::new();
        let counting = Arc::new(CountingHandler {
            count: AtomicUsize::new(0),
        });
        bus.subscribe_chat(Arc::new(FailingHandler));
        bus.subscribe_chat(counting.clone());

        bus.publish(&sample_event()).await.unwrap();

        assert_eq!(counting.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn redeliver_does_not_touch_the_publish_log() {
        let bus = InMemoryEventBus::new();
        let event = sample_event();
        bus.publish(&event).await.unwrap();
        bus.redeliver(event).await;
        assert_eq!(bus.event_count(), 1);
    }
}
