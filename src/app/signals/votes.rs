use crate::app::signals::join_ids;
use crate::core::fetcher::{fetch_json, RetryPolicy};
use crate::domain::model::{SubjectId, VoteCounts};
use crate::domain::ports::ChunkFetcher;
use crate::utils::error::{EnrichError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

pub const CACHE_FILE: &str = "votes_cache.json";

#[derive(Debug, Deserialize)]
struct VotesResponse {
    data: Vec<VoteRow>,
}

#[derive(Debug, Deserialize)]
struct VoteRow {
    id: SubjectId,
    #[serde(flatten)]
    counts: VoteCounts,
}

/// Multi-ID vote totals: `GET {base}/v1/games/votes?universeIds=1,2,...`.
/// Strict call site: a terminal chunk failure aborts the whole run.
pub struct VoteFetcher {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl VoteFetcher {
    pub fn new(client: Client, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }
}

#[async_trait]
impl ChunkFetcher for VoteFetcher {
    type Value = VoteCounts;

    async fn fetch_chunk(&self, chunk: &[SubjectId]) -> Result<HashMap<SubjectId, VoteCounts>> {
        let url = format!(
            "{}/v1/games/votes?universeIds={}",
            self.base_url,
            join_ids(chunk)
        );
        let body = fetch_json(&self.client, &url, &self.policy).await?;

        let response: VotesResponse =
            serde_json::from_value(body).map_err(|source| EnrichError::MalformedResponse {
                url: url.clone(),
                source,
            })?;

        // Subjects omitted from the response stay unknown.
        Ok(response
            .data
            .into_iter()
            .map(|row| (row.id, row.counts))
            .collect())
    }
}
