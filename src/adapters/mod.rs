//! Adapters - concrete implementations of the ports.

pub mod http;
pub mod identity;
pub mod in_memory;
pub mod media;
pub mod postgres;
pub mod redis;
pub mod websocket;
