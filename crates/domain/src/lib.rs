//! Shared types for the newsdesk crates: stream events, sources, chat
//! messages, the common error type, structured trace events and config.

pub mod config;
pub mod error;
pub mod message;
pub mod stream;
pub mod trace;
