use crate::core::fetcher::{fetch_json, RetryPolicy};
use crate::domain::model::{FavoriteCount, SubjectId};
use crate::domain::ports::ChunkFetcher;
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;

pub const CACHE_FILE: &str = "favorites_cache.json";

/// The favorites endpoint only accepts a single universe, so this call
/// site runs with batch size 1.
pub const BATCH_SIZE: usize = 1;

/// Documented lenient-mode default: a failed lookup reads as zero
/// favorites, flagged as degraded in the batch outcome.
pub const FAILURE_DEFAULT: FavoriteCount = FavoriteCount { favorites_count: 0 };

/// Per-universe favorite totals: `GET {base}/v1/games/{id}/favorites/count`.
/// Lenient call site: failures degrade to the default instead of aborting.
pub struct FavoriteFetcher {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl FavoriteFetcher {
    pub fn new(client: Client, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }
}

#[async_trait]
impl ChunkFetcher for FavoriteFetcher {
    type Value = FavoriteCount;

    async fn fetch_chunk(&self, chunk: &[SubjectId]) -> Result<HashMap<SubjectId, FavoriteCount>> {
        let mut values = HashMap::with_capacity(chunk.len());
        for id in chunk {
            let url = format!("{}/v1/games/{}/favorites/count", self.base_url, id);
            let body = fetch_json(&self.client, &url, &self.policy).await?;
            let count: FavoriteCount = serde_json::from_value(body).map_err(|source| {
                EnrichError::MalformedResponse {
                    url: url.clone(),
                    source,
                }
            })?;
            values.insert(*id, count);
        }
        Ok(values)
    }

    fn failure_default(&self) -> Option<FavoriteCount> {
        Some(FAILURE_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetcher::http_client;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            retry_on: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_fetch_single_id() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/v1/games/10/favorites/count");
            then.status(200)
                .json_body(serde_json::json!({"favoritesCount": 321}));
        });

        let fetcher = FavoriteFetcher::new(
            http_client(Duration::from_secs(5)).unwrap(),
            &server.base_url(),
            policy(),
        );
        let values = fetcher.fetch_chunk(&[10]).await.unwrap();

        api_mock.assert();
        assert_eq!(values[&10].favorites_count, 321);
    }

    #[tokio::test]
    async fn test_failure_default_is_zero() {
        let fetcher = FavoriteFetcher::new(
            http_client(Duration::from_secs(5)).unwrap(),
            "http://api.test",
            policy(),
        );
        assert_eq!(fetcher.failure_default(), Some(FAILURE_DEFAULT));
    }
}
