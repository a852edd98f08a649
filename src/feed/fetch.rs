// src/feed/fetch.rs
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use metrics::{counter, histogram};

use crate::error::FetchError;
use crate::feed::types::{Fetcher, RawPayload, Source};

/// Plain GET, no auth, no body, no timeout.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<RawPayload, FetchError> {
        let t0 = std::time::Instant::now();
        let result = self.get(source).await;
        histogram!("feed_fetch_ms", "source" => source.id.clone())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        if let Err(e) = &result {
            tracing::warn!(source = %source.id, error = %e, "fetch failed");
            counter!("feed_fetch_errors_total", "source" => source.id.clone()).increment(1);
        }
        result
    }
}

impl HttpFetcher {
    async fn get(&self, source: &Source) -> Result<RawPayload, FetchError> {
        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| FetchError::transport(&source.id, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_id: source.id.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::transport(&source.id, e))?;

        Ok(RawPayload {
            source_id: source.id.clone(),
            format: source.format,
            body,
            fetched_at: chrono::Utc::now(),
        })
    }
}

/// Canned answer for one source.
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Body(String),
    Status(u16),
    Unreachable(String),
}

/// In-memory fetcher for tests and offline runs. Responses can be swapped
/// between ticks; every call is recorded.
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    responses: Mutex<HashMap<String, FixtureResponse>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, source_id: &str, body: impl Into<String>) -> Self {
        self.set(source_id, FixtureResponse::Body(body.into()));
        self
    }

    pub fn set(&self, source_id: &str, response: FixtureResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(source_id.to_string(), response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn call_count(&self, source_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|c| c.as_str() == source_id)
            .count()
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, source: &Source) -> Result<RawPayload, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(source.id.clone());

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&source.id)
            .cloned()
            .unwrap_or_else(|| FixtureResponse::Status(404));

        match response {
            FixtureResponse::Body(body) => Ok(RawPayload {
                source_id: source.id.clone(),
                format: source.format,
                body,
                fetched_at: chrono::Utc::now(),
            }),
            FixtureResponse::Status(status) => Err(FetchError::Status {
                source_id: source.id.clone(),
                status,
            }),
            FixtureResponse::Unreachable(reason) => Err(FetchError::transport(
                &source.id,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, reason),
            )),
        }
    }
}
