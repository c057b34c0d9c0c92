//! In-memory broadcast adapter.
//!
//! Mirrors the production channel's semantics: best effort, no replay.
//! Frames are recorded for assertions and fanned to any subscribed
//! receivers; a lagging receiver simply misses frames.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{BroadcastFrame, ChatError};
use crate::ports::BroadcastPublisher;

pub struct InMemoryBroadcast {
    frames: Mutex<Vec<BroadcastFrame>>,
    channel: broadcast::Sender<BroadcastFrame>,
}

impl InMemoryBroadcast {
    pub fn new() -> Self {
        let (channel, _) = broadcast::channel(64);
        Self {
            frames: Mutex::new(Vec::new()),
            channel,
        }
    }

    /// Subscribes like another instance's listener would.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastFrame> {
        self.channel.subscribe()
    }

    /// Every frame published so far.
    pub fn frames(&self) -> Vec<BroadcastFrame> {
        self.frames.lock().expect("frame log poisoned").clone()
    }
}

impl Default for InMemoryBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastPublisher for InMemoryBroadcast {
    async fn publish(&self, frame: &BroadcastFrame) -> Result<(), ChatError> {
        self.frames
            .lock()
            .expect("frame log poisoned")
            .push(frame.clone());
        // No receivers is fine; ephemeral frames have no delivery promise.
        let _ = self.channel.send(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceId, RoomId, UserId};

    fn typing_frame() -> BroadcastFrame {
        BroadcastFrame::typing(
            InstanceId::new(),
            RoomId::parse("room_a_b").unwrap(),
            UserId::new("1").unwrap(),
            "A".to_string(),
            true,
        )
    }

    #[tokio::test]
    async fn publish_records_and_fans_out() {
        let adapter = InMemoryBroadcast::new();
        let mut rx = adapter.subscribe();

        adapter.publish(&typing_frame()).await.unwrap();

        assert_eq!(adapter.frames().len(), 1);
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let adapter = InMemoryBroadcast::new();
        assert!(adapter.publish(&typing_frame()).await.is_ok());
    }
}
