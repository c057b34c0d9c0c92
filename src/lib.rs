//! Chat Relay - real-time chat message delivery core.
//!
//! Delivers chat messages to every participant of a room regardless of
//! which gateway instance a participant's connection is attached to:
//! persistence in PostgreSQL, durable fan-out over Redis Streams, and a
//! separate ephemeral pub/sub channel for typing indicators and sender
//! echoes.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
