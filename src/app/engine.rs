use crate::app::signals::{favorites, paid_access, votes};
use crate::app::signals::{favorites::FavoriteFetcher, paid_access::PaidAccessFetcher, votes::VoteFetcher};
use crate::core::batch::{run_batch, BatchOptions, FailureMode};
use crate::core::cache::FreshnessCache;
use crate::core::fetcher::{http_client, RetryPolicy};
use crate::core::merge::{merge_subject, needs_paid_lookup};
use crate::core::pacer::Pacer;
use crate::domain::model::{EnrichedSubject, SubjectId, SubjectSeed};
use crate::domain::ports::{ChunkFetcher, ConfigProvider};
use crate::utils::error::{EnrichError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Drives one enrichment run: per signal, load the cache, fetch only the
/// stale/missing subjects, write results back, then merge everything into
/// the final records. Caches are touched outside the worker pool's
/// concurrent phase; a single process owns them for the run.
pub struct EnrichEngine<C: ConfigProvider> {
    config: C,
    client: reqwest::Client,
}

impl<C: ConfigProvider> EnrichEngine<C> {
    pub fn new(config: C) -> Result<Self> {
        let settings = config.fetch_settings();
        let client = http_client(Duration::from_secs(settings.request_timeout_secs))?;
        Ok(Self { config, client })
    }

    pub async fn run(&self, seeds: &[SubjectSeed]) -> Result<Vec<EnrichedSubject>> {
        let mut seen = HashSet::new();
        let distinct: Vec<&SubjectSeed> = seeds.iter().filter(|s| seen.insert(s.id)).collect();
        let ids: Vec<SubjectId> = distinct.iter().map(|s| s.id).collect();
        tracing::info!(
            "Enriching {} distinct subjects ({} supplied)",
            ids.len(),
            seeds.len()
        );

        let settings = self.config.fetch_settings();
        let policy = RetryPolicy::from_settings(&settings);
        // One pacer for the whole run: the rate budget belongs to the
        // upstream, not to a single signal.
        let pacer = Arc::new(Pacer::from_millis(settings.min_interval_ms));
        let mut deferred: Vec<(PathBuf, FreshnessCache)> = Vec::new();

        let vote_fetcher = Arc::new(VoteFetcher::new(
            self.client.clone(),
            self.config.api_base_url(),
            policy.clone(),
        ));
        let (vote_values, _) = self
            .run_signal(
                votes::CACHE_FILE,
                self.config.votes_max_age_days(),
                &ids,
                vote_fetcher,
                &BatchOptions {
                    batch_size: settings.batch_size,
                    concurrency: settings.concurrency,
                    failure_mode: FailureMode::Strict,
                },
                Arc::clone(&pacer),
                &mut deferred,
            )
            .await?;

        let favorite_fetcher = Arc::new(FavoriteFetcher::new(
            self.client.clone(),
            self.config.api_base_url(),
            policy.clone(),
        ));
        let (favorite_values, favorites_degraded) = self
            .run_signal(
                favorites::CACHE_FILE,
                self.config.favorites_max_age_days(),
                &ids,
                favorite_fetcher,
                &BatchOptions {
                    batch_size: favorites::BATCH_SIZE,
                    concurrency: settings.concurrency,
                    failure_mode: FailureMode::Lenient,
                },
                Arc::clone(&pacer),
                &mut deferred,
            )
            .await?;

        // Expensive fallback, dispatched only for subjects the cheap
        // signals left unknown.
        let lookup_ids: Vec<SubjectId> = distinct
            .iter()
            .filter(|s| needs_paid_lookup(s))
            .map(|s| s.id)
            .collect();
        let paid_values = if lookup_ids.is_empty() {
            HashMap::new()
        } else {
            let paid_fetcher = Arc::new(PaidAccessFetcher::new(
                self.client.clone(),
                self.config.api_base_url(),
                policy.clone(),
            ));
            self.run_signal(
                paid_access::CACHE_FILE,
                self.config.paid_access_max_age_days(),
                &lookup_ids,
                paid_fetcher,
                &BatchOptions {
                    batch_size: settings.batch_size,
                    concurrency: settings.concurrency,
                    failure_mode: FailureMode::Strict,
                },
                Arc::clone(&pacer),
                &mut deferred,
            )
            .await?
            .0
        };

        for (path, cache) in &deferred {
            cache.save(path)?;
        }

        let degraded: HashSet<SubjectId> = favorites_degraded.into_iter().collect();
        Ok(distinct
            .iter()
            .map(|seed| {
                merge_subject(
                    seed,
                    vote_values.get(&seed.id).copied(),
                    favorite_values.get(&seed.id).map(|f| f.favorites_count),
                    degraded.contains(&seed.id),
                    paid_values.get(&seed.id).copied(),
                )
            })
            .collect())
    }

    /// One instantiation of the pattern: freshness split, paced batch
    /// fetch of the stale subset, cache write-back, then resolution of
    /// every requested subject from this run's results or the cache.
    #[allow(clippy::too_many_arguments)]
    async fn run_signal<F>(
        &self,
        cache_file: &str,
        max_age_days: i64,
        ids: &[SubjectId],
        fetcher: Arc<F>,
        options: &BatchOptions,
        pacer: Arc<Pacer>,
        deferred: &mut Vec<(PathBuf, FreshnessCache)>,
    ) -> Result<(HashMap<SubjectId, F::Value>, Vec<SubjectId>)>
    where
        F: ChunkFetcher + 'static,
        F::Value: Serialize + DeserializeOwned,
    {
        let path = Path::new(self.config.cache_dir()).join(cache_file);
        let mut cache = FreshnessCache::load(&path);
        let stale = cache.split_by_freshness(ids, max_age_days);
        tracing::info!(
            "{}: {} of {} subjects stale or missing",
            cache_file,
            stale.len(),
            ids.len()
        );

        let outcome = run_batch(&stale, options, pacer, fetcher).await?;
        let degraded_set: HashSet<SubjectId> = outcome.degraded.iter().copied().collect();

        for (id, value) in &outcome.values {
            // Lenient defaults are not confirmed fetches; never cache them.
            if degraded_set.contains(id) {
                continue;
            }
            cache.set(*id, payload_of(value)?);
        }

        if self.config.persist_per_signal() {
            cache.save(&path)?;
        }

        // Resolve from this run's fetch results first (covers degraded
        // defaults too); the cache only answers for subjects that were
        // fresh enough to skip fetching. A zero-day freshness window must
        // not discard values fetched moments ago.
        let mut values: HashMap<SubjectId, F::Value> = HashMap::new();
        for id in ids {
            if let Some(value) = outcome.values.get(id) {
                values.insert(*id, value.clone());
                continue;
            }
            if let Some(payload) = cache.get(*id, max_age_days) {
                if let Some(value) = value_from_payload(payload) {
                    values.insert(*id, value);
                }
            }
        }

        if !self.config.persist_per_signal() {
            deferred.push((path, cache));
        }

        Ok((values, outcome.degraded))
    }
}

fn payload_of<T: Serialize>(value: &T) -> Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(EnrichError::Config {
            message: format!("cache payload must be a JSON object, got {}", other),
        }),
    }
}

fn value_from_payload<T: DeserializeOwned>(
    payload: &serde_json::Map<String, serde_json::Value>,
) -> Option<T> {
    serde_json::from_value(serde_json::Value::Object(payload.clone())).ok()
}
