//! REST implementation of [`ChatBackend`].
//!
//! `RestChatClient` wraps a `reqwest::Client` and translates each trait
//! method into one HTTP call.  Failures are reported once and never
//! retried; the caller decides what to show.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, RequestBuilder, Response};
use uuid::Uuid;

use nd_domain::config::BackendConfig;
use nd_domain::error::{Error, Result};
use nd_domain::stream::{BoxStream, StreamEvent};
use nd_domain::trace::TraceEvent;
use nd_stream::{frame_stream, from_reqwest};

use crate::backend::ChatBackend;
use crate::types::{ChatHistory, QueryRequest, SessionResponse};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the chat backend.
///
/// Created once and reused; the underlying `reqwest::Client` keeps a
/// connection pool.
#[derive(Debug, Clone)]
pub struct RestChatClient {
    http: Client,
    base_url: String,
}

impl RestChatClient {
    /// Build a new client from the shared `BackendConfig`.
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard client headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("X-Client-Type", "newsdesk")
            .header("X-Trace-Id", Uuid::new_v4().to_string())
    }

    /// Build the full URL for a path like `/api/v1/chat/session`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and turn any non-success status into an error.
    ///
    /// Emits a `TraceEvent::BackendCall` for every attempt that reached
    /// the network.
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::BackendCall {
                    endpoint: endpoint.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::BackendCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = %status, "backend returned an error status");
            return Err(Error::Http(format!("{endpoint} returned {status}: {body}")));
        }

        Ok(resp)
    }

    /// Read a success body as JSON, keeping the raw text in the error.
    async fn json<T: serde::de::DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Http(format!("failed to parse {endpoint} response: {e}: {body}"))
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl ChatBackend for RestChatClient {
    async fn create_session(&self) -> Result<String> {
        const ENDPOINT: &str = "POST /api/v1/chat/session";
        let url = self.url("/api/v1/chat/session");
        let resp = self
            .execute(ENDPOINT, self.http.post(&url).header(ACCEPT, "application/json"))
            .await?;

        let session: SessionResponse = Self::json(ENDPOINT, resp).await?;
        Ok(session.session_id)
    }

    async fn fetch_history(&self, session_id: &str) -> Result<ChatHistory> {
        const ENDPOINT: &str = "GET /api/v1/chat/history";
        let url = self.url(&format!("/api/v1/chat/history/{session_id}"));
        let resp = self
            .execute(ENDPOINT, self.http.get(&url).header(ACCEPT, "application/json"))
            .await?;

        Self::json(ENDPOINT, resp).await
    }

    async fn query(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = self.url("/api/v1/chat/query");
        let body = QueryRequest {
            message,
            session_id,
        };
        let rb = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .json(&body);

        let resp = self.execute("POST /api/v1/chat/query", rb).await?;
        Ok(frame_stream(resp))
    }
}
