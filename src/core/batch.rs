use crate::core::pacer::Pacer;
use crate::domain::model::SubjectId;
use crate::domain::ports::ChunkFetcher;
use crate::utils::error::{EnrichError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Upper bound on simultaneously running workers, whatever the caller asks for.
pub const MAX_WORKERS: usize = 32;

/// What a terminal chunk failure does to the run. The two production call
/// sites differ (votes abort, favorites degrade to a default), so the mode
/// is a required choice rather than a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Abort the whole run and discard partial results.
    Strict,
    /// Record the fetcher's documented default for the affected subjects
    /// and continue.
    Lenient,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub failure_mode: FailureMode,
}

/// Merged result of one batch run. `degraded` lists subjects that carry a
/// lenient-mode default, so callers can tell a degraded zero from a
/// confirmed one.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub values: HashMap<SubjectId, T>,
    pub degraded: Vec<SubjectId>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            degraded: Vec::new(),
        }
    }
}

/// Deduplicates (first occurrence wins), drops non-positive ids, and
/// partitions the remainder into ordered chunks of at most `batch_size`.
pub fn plan_chunks(ids: &[SubjectId], batch_size: usize) -> Vec<Vec<SubjectId>> {
    let mut seen = HashSet::new();
    let distinct: Vec<SubjectId> = ids
        .iter()
        .copied()
        .filter(|id| *id > 0 && seen.insert(*id))
        .collect();

    distinct
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Runs the batch-fetch: `concurrency` workers (clamped to `[1, MAX_WORKERS]`)
/// pull chunk indices from a shared cursor, pace each dispatch, and union
/// per-chunk results into one map. Chunks are disjoint, so no write
/// conflicts occur. Strict-mode failure stops new claims, lets in-flight
/// attempts finish, and returns the first error with no partial map.
pub async fn run_batch<F>(
    ids: &[SubjectId],
    options: &BatchOptions,
    pacer: Arc<Pacer>,
    fetcher: Arc<F>,
) -> Result<BatchOutcome<F::Value>>
where
    F: ChunkFetcher + 'static,
{
    let chunks = Arc::new(plan_chunks(ids, options.batch_size));
    if chunks.is_empty() {
        return Ok(BatchOutcome::default());
    }

    let workers = options.concurrency.clamp(1, MAX_WORKERS).min(chunks.len());
    tracing::debug!(
        "Running batch: {} chunks, {} workers, {:?} mode",
        chunks.len(),
        workers,
        options.failure_mode
    );

    let cursor = Arc::new(AtomicUsize::new(0));
    let aborted = Arc::new(AtomicBool::new(false));
    let values = Arc::new(Mutex::new(HashMap::new()));
    let degraded = Arc::new(Mutex::new(Vec::new()));
    let first_error = Arc::new(Mutex::new(None::<EnrichError>));
    let mode = options.failure_mode;

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let chunks = Arc::clone(&chunks);
        let cursor = Arc::clone(&cursor);
        let aborted = Arc::clone(&aborted);
        let values = Arc::clone(&values);
        let degraded = Arc::clone(&degraded);
        let first_error = Arc::clone(&first_error);
        let pacer = Arc::clone(&pacer);
        let fetcher = Arc::clone(&fetcher);

        handles.push(tokio::spawn(async move {
            loop {
                if aborted.load(Ordering::SeqCst) {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::SeqCst);
                if idx >= chunks.len() {
                    break;
                }

                pacer.wait().await;
                match fetcher.fetch_chunk(&chunks[idx]).await {
                    Ok(fetched) => {
                        values.lock().await.extend(fetched);
                    }
                    Err(e) => match mode {
                        FailureMode::Strict => {
                            tracing::warn!("Chunk {} failed, aborting run: {}", idx, e);
                            aborted.store(true, Ordering::SeqCst);
                            let mut slot = first_error.lock().await;
                            if slot.is_none() {
                                *slot = Some(EnrichError::ChunkFailed {
                                    chunk_index: idx,
                                    source: Box::new(e),
                                });
                            }
                            break;
                        }
                        FailureMode::Lenient => {
                            tracing::warn!(
                                "Chunk {} failed, degrading {} subjects to default: {}",
                                idx,
                                chunks[idx].len(),
                                e
                            );
                            if let Some(default) = fetcher.failure_default() {
                                let mut map = values.lock().await;
                                for id in &chunks[idx] {
                                    map.insert(*id, default.clone());
                                }
                            }
                            degraded.lock().await.extend(chunks[idx].iter().copied());
                        }
                    },
                }
            }
        }));
    }

    for handle in handles {
        handle.await.map_err(|e| EnrichError::Task {
            message: format!("batch worker panicked: {}", e),
        })?;
    }

    if let Some(err) = first_error.lock().await.take() {
        return Err(err);
    }

    let values = match Arc::try_unwrap(values) {
        Ok(mutex) => mutex.into_inner(),
        Err(arc) => arc.lock().await.clone(),
    };
    let degraded = match Arc::try_unwrap(degraded) {
        Ok(mutex) => mutex.into_inner(),
        Err(arc) => arc.lock().await.clone(),
    };

    Ok(BatchOutcome { values, degraded })
}
