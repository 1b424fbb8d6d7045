use crate::app::signals::join_ids;
use crate::core::fetcher::{fetch_json, RetryPolicy};
use crate::domain::model::{PaidAccessInfo, SubjectId};
use crate::domain::ports::ChunkFetcher;
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

pub const CACHE_FILE: &str = "paid_access_cache.json";

#[derive(Debug, Deserialize)]
struct GamesResponse {
    data: Vec<GameRow>,
}

#[derive(Debug, Deserialize)]
struct GameRow {
    id: SubjectId,
    #[serde(flatten)]
    info: PaidAccessInfo,
}

/// Secondary paid-access source: `GET {base}/v1/games?universeIds=...`.
/// Expensive relative to the cheap seed signals, so the engine only
/// dispatches it for subjects the cascade left unknown. Strict call site.
pub struct PaidAccessFetcher {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl PaidAccessFetcher {
    pub fn new(client: Client, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }
}

#[async_trait]
impl ChunkFetcher for PaidAccessFetcher {
    type Value = PaidAccessInfo;

    async fn fetch_chunk(&self, chunk: &[SubjectId]) -> Result<HashMap<SubjectId, PaidAccessInfo>> {
        let url = format!("{}/v1/games?universeIds={}", self.base_url, join_ids(chunk));
        let body = fetch_json(&self.client, &url, &self.policy).await?;

        let response: GamesResponse =
            serde_json::from_value(body).map_err(|source| EnrichError::MalformedResponse {
                url: url.clone(),
                source,
            })?;

        Ok(response
            .data
            .into_iter()
            .map(|row| (row.id, row.info))
            .collect())
    }
}
