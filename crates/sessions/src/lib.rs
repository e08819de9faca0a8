//! Session handling for the newsdesk client.
//!
//! One opaque session token identifies the conversation with the backend.
//! It is persisted in a small key-value file so it survives restarts,
//! created lazily through a [`SessionCreator`], and forgotten on reset.

pub mod lifecycle;
pub mod store;
pub mod timestamp;

pub use lifecycle::{SessionCreator, SessionManager};
pub use store::TokenStore;
pub use timestamp::{format_api_timestamp, format_timestamp};
