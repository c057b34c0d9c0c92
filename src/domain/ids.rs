//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ChatError;

/// Prefix every room identifier must carry on the wire.
pub const ROOM_ID_PREFIX: &str = "room_";

/// Unique identifier for a chat room.
///
/// Opaque string with a mandatory `room_` prefix. For two-party rooms the
/// id is a pure function of the unordered user pair (see [`RoomId::for_pair`]),
/// which is what makes room creation idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Parses and validates a wire-supplied room id.
    pub fn parse(s: impl Into<String>) -> Result<Self, ChatError> {
        let s = s.into();
        if !s.starts_with(ROOM_ID_PREFIX) || s.len() == ROOM_ID_PREFIX.len() {
            return Err(ChatError::validation(format!("Invalid room ID: {}", s)));
        }
        Ok(Self(s))
    }

    /// Canonical id for a two-party room.
    ///
    /// Order-independent: the pair is sorted before the id is derived, so
    /// `for_pair(a, b) == for_pair(b, a)`.
    pub fn for_pair(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
        Self(format!("{}{}_{}", ROOM_ID_PREFIX, lo, hi))
    }

    /// Fresh id for a multi-party room.
    pub fn random() -> Self {
        Self(format!("{}{}", ROOM_ID_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Unique identifier for a user, issued by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Result<Self, ChatError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(ChatError::validation("User id cannot be empty"));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a persisted message.
///
/// UUIDv7: time-ordered, so ids sort consistently with timestamps without
/// a central sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier for one client connection, generated server-side at accept.
///
/// Ephemeral: never persisted, never leaves the owning gateway instance
/// except in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one gateway process, generated at startup.
///
/// Stamped on every ephemeral broadcast frame so an instance can skip
/// frames it published itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
