//! # Source Client
//!
//! Read-only access to the clinic API.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fetch(endpoint, params) ──► Some(json)   2xx with a JSON body          │
//! │                          └─► None         timeout / transport error /   │
//! │                                           non-2xx / unreadable body     │
//! │                                                                         │
//! │  None means "no data this call", never "entity does not exist".        │
//! │  Every None is logged at WARN before it is returned.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calls are paced: two requests are never issued closer together than the
//! configured interval.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::SourceSettings;
use crate::error::SyncResult;

/// Query parameters of one call.
pub type QueryParams<'a> = [(&'a str, String)];

/// A source of clinic records.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetches one endpoint. Failures are reported and yield `None`.
    async fn fetch(&self, endpoint: &str, params: &QueryParams<'_>) -> Option<Value>;
}

#[async_trait]
impl<T: SourceClient + ?Sized> SourceClient for &T {
    async fn fetch(&self, endpoint: &str, params: &QueryParams<'_>) -> Option<Value> {
        (**self).fetch(endpoint, params).await
    }
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// reqwest-backed client for the clinic API.
pub struct HttpSourceClient {
    client: Client,
    base_url: String,
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl HttpSourceClient {
    /// Builds a client from settings.
    pub fn new(settings: &SourceSettings) -> SyncResult<Self> {
        let client = Client::builder().timeout(settings.timeout()).build()?;

        Ok(HttpSourceClient {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            interval: settings.request_interval(),
            last_call: Mutex::new(None),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Waits until the pacing interval since the previous call has elapsed.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    #[instrument(level = "debug", skip(self, params))]
    async fn fetch(&self, endpoint: &str, params: &QueryParams<'_>) -> Option<Value> {
        self.pace().await;

        let url = self.url(endpoint);
        debug!(url = %url, params = params.len(), "GET");

        let response = match self.client.get(&url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Source request failed");
                return None;
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    endpoint = %endpoint,
                    status = ?e.status(),
                    "Source returned an error status"
                );
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Source body is not JSON");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str, interval_ms: u64) -> SourceSettings {
        SourceSettings {
            base_url: base_url.to_string(),
            timeout_secs: 1,
            request_interval_ms: interval_ms,
        }
    }

    #[test]
    fn test_url_joining() {
        let client = HttpSourceClient::new(&settings("http://clinic.local/api/", 0)).unwrap();
        assert_eq!(client.url("/clientes"), "http://clinic.local/api/clientes");
        assert_eq!(
            client.url("pets/10/vacinacoes"),
            "http://clinic.local/api/pets/10/vacinacoes"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_paced() {
        let client = HttpSourceClient::new(&settings("http://clinic.local/api", 150)).unwrap();

        let start = Instant::now();
        client.pace().await;
        client.pace().await;
        client.pace().await;

        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_unreachable_source_yields_none() {
        // Port 9 (discard) on localhost is not expected to speak HTTP
        let client = HttpSourceClient::new(&settings("http://127.0.0.1:9", 0)).unwrap();
        assert!(client.fetch("/clientes", &[]).await.is_none());
    }
}
