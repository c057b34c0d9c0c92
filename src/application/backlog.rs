//! FetchBacklog query handler - cursor-paginated history reads.

use std::sync::Arc;

use crate::domain::{ChatError, Message, RoomId, Timestamp, UserId};
use crate::ports::{MessageStore, RoomDirectory};

/// Page-size policy for backlog reads.
#[derive(Debug, Clone, Copy)]
pub struct BacklogLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl BacklogLimits {
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

impl Default for BacklogLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100,
        }
    }
}

/// Query for one page of room history.
#[derive(Debug, Clone)]
pub struct BacklogQuery {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub limit: Option<u32>,
    /// Exclusive upper bound; `None` means the newest page. Chain pages
    /// by passing the oldest returned timestamp.
    pub before: Option<Timestamp>,
}

#[derive(Clone)]
pub struct FetchBacklogHandler {
    directory: Arc<dyn RoomDirectory>,
    store: Arc<dyn MessageStore>,
    limits: BacklogLimits,
}

impl FetchBacklogHandler {
    pub fn new(
        directory: Arc<dyn RoomDirectory>,
        store: Arc<dyn MessageStore>,
        limits: BacklogLimits,
    ) -> Self {
        Self {
            directory,
            store,
            limits,
        }
    }

    /// Returns at most one page, most-recent-first.
    pub async fn handle(&self, query: BacklogQuery) -> Result<Vec<Message>, ChatError> {
        let authorized = self
            .directory
            .check_access(&query.room_id, &query.user_id)
            .await?;
        if !authorized {
            return Err(ChatError::authorization(format!(
                "User {} has no access to {}",
                query.user_id, query.room_id
            )));
        }

        let limit = self.limits.clamp(query.limit);
        self.store.query(&query.room_id, limit, query.before).await
    }
}
