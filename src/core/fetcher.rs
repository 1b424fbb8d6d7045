use crate::domain::model::FetchSettings;
use crate::utils::error::{EnrichError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// The upstream rejects default client user agents, so requests present a
/// realistic browser one.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

/// Immutable per-call retry schedule: capped exponential backoff over an
/// allow-list of transient HTTP statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retry_on: HashSet<u16>,
}

impl RetryPolicy {
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            retry_on: settings.retry_on_statuses.iter().copied().collect(),
        }
    }

    /// Sleep before retry number `attempt` (0-based):
    /// `min(base_delay * 2^attempt, max_delay)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Shared HTTP client with the per-request timeout and the headers the
/// upstream requires on every call.
pub fn http_client(request_timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

    let client = Client::builder()
        .default_headers(headers)
        .timeout(request_timeout)
        .build()?;
    Ok(client)
}

/// One GET returning parsed JSON, retrying transient failures per `policy`.
/// Network-level failures always retry; HTTP statuses retry only when
/// allow-listed; any other non-2xx status and JSON parse failures fail
/// immediately without spending retry budget.
pub async fn fetch_json(client: &Client, url: &str, policy: &RetryPolicy) -> Result<Value> {
    let mut attempt: u32 = 0;
    loop {
        match attempt_fetch(client, url).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable(&policy.retry_on) => {
                if attempt >= policy.max_retries {
                    return Err(EnrichError::RetryExhausted {
                        attempts: attempt + 1,
                        source: Box::new(e),
                    });
                }
                let delay = policy.backoff_delay(attempt);
                tracing::debug!(
                    "Retryable failure for {} (attempt {}): {}. Backing off {:?}",
                    url,
                    attempt + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn attempt_fetch(client: &Client, url: &str) -> Result<Value> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(EnrichError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| EnrichError::MalformedResponse {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            retry_on: [429, 500, 502, 503, 504].into_iter().collect(),
        }
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8_000),
            retry_on: HashSet::new(),
        };

        let delays: Vec<Duration> = (0..8).map(|a| policy.backoff_delay(a)).collect();
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_millis(1_000));
        assert_eq!(delays[4], Duration::from_millis(8_000));
        assert_eq!(delays[7], Duration::from_millis(8_000));
        // Huge attempt numbers must not overflow.
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(8_000));
    }

    #[tokio::test]
    async fn test_success_parses_json_body() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"ok": true}));
        });

        let client = http_client(Duration::from_secs(5)).unwrap();
        let value = fetch_json(&client, &server.url("/data"), &fast_policy(3))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(value["ok"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_sends_required_headers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/data")
                .header("accept", "application/json")
                .header("user-agent", BROWSER_USER_AGENT);
            then.status(200).json_body(serde_json::json!({}));
        });

        let client = http_client(Duration::from_secs(5)).unwrap();
        fetch_json(&client, &server.url("/data"), &fast_policy(0))
            .await
            .unwrap();
        api_mock.assert();
    }

    #[tokio::test]
    async fn test_permanent_404_fails_without_retry() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let client = http_client(Duration::from_secs(5)).unwrap();
        let err = fetch_json(&client, &server.url("/missing"), &fast_policy(3))
            .await
            .unwrap_err();

        assert_eq!(api_mock.hits(), 1);
        match err {
            EnrichError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("expected HttpStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retryable_503_exhausts_budget() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(503);
        });

        let client = http_client(Duration::from_secs(5)).unwrap();
        let err = fetch_json(&client, &server.url("/busy"), &fast_policy(2))
            .await
            .unwrap_err();

        // Initial attempt + 2 retries.
        assert_eq!(api_mock.hits(), 3);
        match err {
            EnrichError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                match *source {
                    EnrichError::HttpStatus { status, .. } => assert_eq!(status, 503),
                    other => panic!("expected HttpStatus cause, got {:?}", other),
                }
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_503s() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        // Scripted responder: 503 for the first two requests, then 200.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let server_hits = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let request_number = server_hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = if request_number < 2 {
                    "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\
                     connection: close\r\n\r\n"
                        .to_string()
                } else {
                    let body = r#"{"recovered":true}"#;
                    format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                };
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        let client = http_client(Duration::from_secs(5)).unwrap();
        let url = format!("http://{}/busy", addr);
        let value = fetch_json(&client, &url, &fast_policy(3)).await.unwrap();

        // Two backoff sleeps, then success on the third request.
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(value["recovered"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_malformed_body_fails_without_retry() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/garbled");
            then.status(200).body("not json at all");
        });

        let client = http_client(Duration::from_secs(5)).unwrap();
        let err = fetch_json(&client, &server.url("/garbled"), &fast_policy(3))
            .await
            .unwrap_err();

        assert_eq!(api_mock.hits(), 1);
        assert!(matches!(err, EnrichError::MalformedResponse { .. }));
    }
}
