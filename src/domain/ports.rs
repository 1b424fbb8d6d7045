use crate::domain::model::{FetchSettings, SubjectId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn cache_dir(&self) -> &str;
    fn output_path(&self) -> &str;
    fn fetch_settings(&self) -> FetchSettings;
    fn votes_max_age_days(&self) -> i64;
    fn favorites_max_age_days(&self) -> i64;
    fn paid_access_max_age_days(&self) -> i64;
    /// Save each signal's cache as soon as its batch completes, instead of
    /// once at run end. Bounds data loss on crash.
    fn persist_per_signal(&self) -> bool;
}

/// One remote fetch strategy driven by the batch worker pool. A chunk holds
/// 1..=batch_size subject ids; subjects missing from the returned map are
/// unknown, not errors.
#[async_trait]
pub trait ChunkFetcher: Send + Sync {
    type Value: Clone + Send + Sync + 'static;

    async fn fetch_chunk(&self, chunk: &[SubjectId]) -> Result<HashMap<SubjectId, Self::Value>>;

    /// Value recorded for a chunk's subjects when the run is lenient and the
    /// chunk fails terminally. `None` leaves the subjects absent.
    fn failure_default(&self) -> Option<Self::Value> {
        None
    }
}
