use roc_core::{LogBatch, LogFileChunk, QueueSnapshot};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Bounded per-request timeout; fetches are isolated tasks and must not hang
/// the polling loop.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("daemon unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("daemon returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response payload: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Query for the shared daemon event stream (sequence-cursor mode).
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub since: u64,
    pub limit: usize,
    /// Request the most-recent-N events instead of resuming from `since`.
    pub tail: bool,
    pub level: Option<String>,
    pub component: Option<String>,
    pub lane: Option<String>,
    pub request_id: Option<String>,
    pub item_id: Option<i64>,
}

impl LogQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("since", self.since.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if self.tail {
            params.push(("tail", "true".to_string()));
        }
        if let Some(level) = &self.level {
            params.push(("level", level.clone()));
        }
        if let Some(component) = &self.component {
            params.push(("component", component.clone()));
        }
        if let Some(lane) = &self.lane {
            params.push(("lane", lane.clone()));
        }
        if let Some(request_id) = &self.request_id {
            params.push(("request", request_id.clone()));
        }
        if let Some(item_id) = self.item_id {
            params.push(("item", item_id.to_string()));
        }
        params
    }
}

/// Read-only HTTP/JSON client for the processing daemon.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    http: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TransportError::Build)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(DaemonClient { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        params: &[(&'static str, String)],
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(TransportError::Unavailable)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(TransportError::Decode)
    }

    /// Full work-queue snapshot; polled at a fixed interval.
    pub async fn fetch_queue(&self) -> Result<QueueSnapshot, TransportError> {
        self.get_json(self.url("queue"), &[]).await
    }

    /// Incremental read of the shared daemon stream.
    pub async fn fetch_logs(&self, query: &LogQuery) -> Result<LogBatch, TransportError> {
        self.get_json(self.url("logs"), &query.params()).await
    }

    /// Read a chunk of a per-item log file. `offset` counts lines; zero asks
    /// for the tail of the file, and the response's offset is the resume
    /// position just past the returned lines.
    pub async fn fetch_log_tail(
        &self,
        item_id: i64,
        offset: u64,
        limit: usize,
    ) -> Result<LogFileChunk, TransportError> {
        let params = [
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json(self.url(&format!("items/{item_id}/log")), &params)
            .await
    }
}
