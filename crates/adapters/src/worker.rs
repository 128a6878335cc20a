//! HTTP client for the log ingestion worker.

use console_relay_config::RelayConfig;
use console_relay_domain::{LogRecord, StoredLogEntry, TraceId, TraceSummary};
use console_relay_ports::{
    BoxFuture, IngestAck, IngestPort, LogStorePort, RecentTraces, TraceLogs,
};
use console_relay_shared::{ErrorCode, ErrorEnvelope, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

const LOG_PATH: &str = "/log";
const LOGS_PATH: &str = "/logs";
const RECENT_TRACES_PATH: &str = "/traces/recent";
const CLEAR_PATH: &str = "/logs/clear";
const DEFAULT_RATE_LIMIT_ERROR: &str = "rate limit exceeded";

/// Client for the worker's ingest, read and clear endpoints.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    client: reqwest::Client,
    base_url: Box<str>,
}

impl WorkerClient {
    /// Create a client rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "worker url must be non-empty",
            ));
        }
        Url::parse(base_url).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("invalid worker url: {error}"),
            )
            .with_metadata("workerUrl", base_url)
        })?;

        let client = reqwest::Client::builder().build().map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::new("relay", "client_init_failed"),
                format!("failed to build worker client: {error}"),
            )
        })?;

        Ok(Self {
            client,
            base_url: base_url.to_owned().into_boxed_str(),
        })
    }

    /// Create a client from the relay config.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Self::new(&config.worker_url)
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn endpoint_with_query(&self, path: &str, key: &str, value: &str) -> Result<Url> {
        Url::parse_with_params(&self.endpoint(path), [(key, value)]).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("invalid worker endpoint: {error}"),
            )
        })
    }

    async fn post_log(&self, record: &LogRecord) -> Result<IngestAck> {
        let response = self
            .client
            .post(self.endpoint(LOG_PATH))
            .json(record)
            .send()
            .await
            .map_err(|error| map_reqwest_error(&error))?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|error| map_reqwest_error(&error))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = serde_json::from_slice::<IngestResponse>(&payload).unwrap_or_default();
            return Ok(IngestAck::RateLimited {
                remaining_quota: body.remaining_quota.unwrap_or(0),
                error: body
                    .error
                    .unwrap_or_else(|| DEFAULT_RATE_LIMIT_ERROR.to_owned())
                    .into_boxed_str(),
            });
        }
        if !status.is_success() {
            return Err(map_worker_http_error(status, &payload));
        }
        if payload.is_empty() {
            return Ok(IngestAck::Accepted {
                remaining_quota: None,
            });
        }

        let body: IngestResponse = decode(&payload, "log")?;
        if body.success == Some(false) {
            return Err(ErrorEnvelope::unexpected(
                ErrorCode::invalid_response(),
                body.error
                    .unwrap_or_else(|| "worker rejected the record".to_owned()),
            )
            .with_metadata("status", status.as_u16().to_string()));
        }
        Ok(IngestAck::Accepted {
            remaining_quota: body.remaining_quota,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|error| map_reqwest_error(&error))?;
        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|error| map_reqwest_error(&error))?;

        if !status.is_success() {
            return Err(map_worker_http_error(status, &payload)
                .with_metadata("operation", operation));
        }
        decode(&payload, operation)
    }

    async fn get_recent_traces(&self, limit: u32) -> Result<RecentTraces> {
        let url =
            self.endpoint_with_query(RECENT_TRACES_PATH, "limit", &limit.to_string())?;
        let body: TracesResponse = self.fetch(self.client.get(url), "recent_traces").await?;
        let (traces, skipped) = decode_rows::<TraceSummary>(body.traces);
        Ok(RecentTraces { traces, skipped })
    }

    async fn get_trace_logs(&self, trace_id: &TraceId) -> Result<TraceLogs> {
        let url = self.endpoint_with_query(LOGS_PATH, "trace_id", trace_id.as_str())?;
        let body: LogsResponse = self.fetch(self.client.get(url), "trace_logs").await?;
        let (entries, skipped) = decode_rows::<StoredLogEntry>(body.logs);
        Ok(TraceLogs { entries, skipped })
    }

    async fn delete_logs(&self) -> Result<u64> {
        let body: ClearResponse = self
            .fetch(self.client.delete(self.endpoint(CLEAR_PATH)), "clear_logs")
            .await?;
        Ok(body.deleted)
    }
}

impl IngestPort for WorkerClient {
    fn send(&self, record: LogRecord) -> BoxFuture<'_, Result<IngestAck>> {
        Box::pin(async move { self.post_log(&record).await })
    }
}

impl LogStorePort for WorkerClient {
    fn recent_traces(&self, limit: u32) -> BoxFuture<'_, Result<RecentTraces>> {
        Box::pin(async move { self.get_recent_traces(limit).await })
    }

    fn trace_logs<'a>(&'a self, trace_id: &'a TraceId) -> BoxFuture<'a, Result<TraceLogs>> {
        Box::pin(async move { self.get_trace_logs(trace_id).await })
    }

    fn clear_logs(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(async move { self.delete_logs().await })
    }
}

#[derive(Debug, Default, Deserialize)]
struct IngestResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    remaining_quota: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TracesResponse {
    #[serde(default)]
    traces: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ClearResponse {
    #[serde(default)]
    deleted: u64,
}

#[derive(Debug, Deserialize)]
struct WorkerErrorResponse {
    error: Option<String>,
}

fn decode<T: DeserializeOwned>(payload: &[u8], operation: &'static str) -> Result<T> {
    serde_json::from_slice(payload).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::invalid_response(),
            format!("failed to decode worker response: {error}"),
        )
        .with_metadata("operation", operation)
    })
}

/// Decode each row independently; malformed rows are dropped and counted.
fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> (Vec<T>, usize) {
    let mut decoded = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in rows {
        match serde_json::from_value::<T>(row) {
            Ok(value) => decoded.push(value),
            Err(error) => {
                tracing::debug!(%error, "skipping malformed worker row");
                skipped += 1;
            },
        }
    }
    (decoded, skipped)
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(ErrorCode::timeout(), "worker request timed out");
    }
    let envelope = ErrorEnvelope::unexpected(
        ErrorCode::transport(),
        format!("worker request failed: {error}"),
    );
    if error.is_connect() {
        return envelope.with_metadata("connect", "true");
    }
    envelope
}

fn map_worker_http_error(status: StatusCode, payload: &[u8]) -> ErrorEnvelope {
    let message = serde_json::from_slice::<WorkerErrorResponse>(payload)
        .ok()
        .and_then(|response| response.error)
        .unwrap_or_else(|| format!("worker responded with status {}", status.as_u16()));

    let envelope = if status.is_client_error() {
        ErrorEnvelope::expected(ErrorCode::http_status(), message)
    } else {
        ErrorEnvelope::unexpected(ErrorCode::http_status(), message)
    };
    envelope.with_metadata("status", status.as_u16().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_is_trimmed() -> Result<()> {
        let client = WorkerClient::new(" http://localhost:8787/ ")?;
        assert_eq!(client.base_url(), "http://localhost:8787");
        assert_eq!(client.endpoint(LOG_PATH), "http://localhost:8787/log");
        Ok(())
    }

    #[test]
    fn rejects_invalid_base_url() {
        let error = WorkerClient::new("not a url").err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::invalid_input())
        );
    }

    #[test]
    fn query_values_are_encoded() -> Result<()> {
        let client = WorkerClient::new("http://localhost:8787")?;
        let url = client.endpoint_with_query(LOGS_PATH, "trace_id", "trace_1 &x")?;
        assert_eq!(url.as_str(), "http://localhost:8787/logs?trace_id=trace_1+%26x");
        Ok(())
    }

    #[test]
    fn malformed_rows_are_counted() {
        let rows = vec![
            json!({"id": "trace_1_a", "timestamp": 5, "logCount": 2}),
            json!({"id": 42}),
            json!("garbage"),
        ];
        let (traces, skipped) = decode_rows::<TraceSummary>(rows);
        assert_eq!(traces.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn http_error_carries_status_and_worker_message() {
        let error = map_worker_http_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"error":"redis unavailable"}"#,
        );
        assert_eq!(error.code, ErrorCode::http_status());
        assert_eq!(error.message, "redis unavailable");
        assert_eq!(error.metadata_value("status"), Some("500"));
    }
}
