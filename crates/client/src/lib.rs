//! `nd-client`: HTTP client for the chat backend.
//!
//! Provides the [`ChatBackend`] trait that abstracts over the backend API,
//! the production [`RestChatClient`] built on `reqwest`, and the wire DTOs.
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use nd_client::{ChatBackend, RestChatClient};
//! use nd_domain::config::BackendConfig;
//!
//! # async fn example() -> nd_domain::error::Result<()> {
//! let client = RestChatClient::new(&BackendConfig::default())?;
//! let session = client.create_session().await?;
//! let mut events = client.query(&session, "What happened in Bern today?").await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod rest;
pub mod types;

pub use backend::ChatBackend;
pub use rest::RestChatClient;
pub use types::{ChatHistory, ChatHistoryMessage, HistoryRole, QueryRequest, SessionResponse};
