//! HTTP probe layer.
//!
//! Checkers talk to targets through the [`Prober`] trait so tests can
//! substitute canned responses. [`HttpProber`] is the reqwest-backed
//! implementation used in production.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Fixed User-Agent sent on every outbound probe.
pub const USER_AGENT: &str = "vigil-monitor/0.1";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("timeout fetching {url}")]
    Timeout { url: String },
}

/// Raw response metadata handed to the checkers. The freshness checker
/// only reads `headers`; the status checker reads `status` and `body`.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for issuing a single GET against a monitored URL.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<ProbeResponse, FetchError>;
}

/// Reqwest-based prober with a shared connection pool.
///
/// No request timeout and no retries: a failed check waits for the next
/// scheduled tick, and a hung request stalls only its own cycle.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self {
            client: Self::build_client(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn build_client() -> Client {
        Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(20)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client")
    }

    /// The underlying client, shared with the notifier.
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<ProbeResponse, FetchError> {
        let mut req = self.client.get(url);
        if let Some(token) = bearer {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(url, status, "probe complete");

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        Ok(ProbeResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let prober = HttpProber::new();
        let resp = prober
            .get(&format!("{}/status", server.uri()), None)
            .await
            .unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.body, b"ok");
    }

    #[tokio::test]
    async fn get_attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let prober = HttpProber::new();
        let resp = prober
            .get(&format!("{}/status", server.uri()), Some("tok-123"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
    }

    #[tokio::test]
    async fn non_success_status_is_not_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let prober = HttpProber::new();
        let resp = prober.get(&server.uri(), None).await.unwrap();
        assert_eq!(resp.status, 503);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let prober = HttpProber::new();
        let err = prober.get("http://127.0.0.1:1/status", None).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
