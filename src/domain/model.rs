use crate::utils::error::{EnrichError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the game universe being enriched. Always positive.
pub type SubjectId = u64;

/// Caller-supplied input record: the subject plus whatever paid-access
/// metadata the upstream listing already carried. Missing fields stay
/// unknown and may be resolved later by the merge cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSeed {
    pub id: SubjectId,
    pub is_paid_access: Option<bool>,
    pub price: Option<i64>,
}

impl SubjectSeed {
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            is_paid_access: None,
            price: None,
        }
    }

    /// Parses one JSON record, tolerating the id key variants seen in the
    /// wild: `universeId`, `universe_id`, `id`. Returns `None` when no
    /// usable positive id is present.
    pub fn from_json_record(record: &Value) -> Option<Self> {
        let obj = record.as_object()?;
        let id = ["universeId", "universe_id", "id"]
            .iter()
            .find_map(|key| obj.get(*key))
            .and_then(subject_id_from_value)?;

        Some(Self {
            id,
            is_paid_access: obj.get("isPaidAccess").and_then(Value::as_bool),
            price: obj.get("price").and_then(Value::as_i64),
        })
    }
}

/// Extracts a positive integer id from a JSON number, dropping
/// non-positive, non-finite, and fractional values.
pub fn subject_id_from_value(value: &Value) -> Option<SubjectId> {
    if let Some(n) = value.as_u64() {
        return (n > 0).then_some(n);
    }
    if let Some(f) = value.as_f64() {
        if f.is_finite() && f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
            return Some(f as u64);
        }
    }
    None
}

/// Parses a seed list from the supported top-level JSON shapes:
/// `{"data": [...]}`, a bare array, or a map of id -> record.
pub fn seeds_from_json(value: &Value) -> Result<Vec<SubjectSeed>> {
    let records: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(items)) => items.iter().collect(),
            None if obj.values().all(|v| v.is_object()) => obj.values().collect(),
            _ => {
                return Err(EnrichError::Config {
                    message: "Unsupported input JSON shape (expected array, {data: []}, or id map)"
                        .to_string(),
                })
            }
        },
        _ => {
            return Err(EnrichError::Config {
                message: "Unsupported input JSON shape (expected array, {data: []}, or id map)"
                    .to_string(),
            })
        }
    };

    Ok(records
        .into_iter()
        .filter_map(SubjectSeed::from_json_record)
        .collect())
}

/// Up/down vote totals as returned by the votes endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    #[serde(rename = "upVotes")]
    pub up_votes: u64,
    #[serde(rename = "downVotes")]
    pub down_votes: u64,
}

/// Favorite total as returned by the per-universe favorites endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCount {
    #[serde(rename = "favoritesCount")]
    pub favorites_count: u64,
}

/// Paid-access fields from the games detail endpoint, the expensive
/// secondary source for subjects the cheap signals leave unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidAccessInfo {
    #[serde(rename = "isPaidAccess")]
    pub is_paid_access: Option<bool>,
    pub price: Option<i64>,
}

/// Final per-subject record. Signal fields are tri-state: `None` means
/// "never determined", which is distinct from a confirmed zero/false.
/// `favorites_degraded` marks a lenient-mode default rather than a
/// confirmed count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedSubject {
    pub id: SubjectId,
    pub up_votes: Option<u64>,
    pub down_votes: Option<u64>,
    pub favorites: Option<u64>,
    pub favorites_degraded: bool,
    pub is_paid_access: Option<bool>,
    pub price: Option<i64>,
}

/// Knobs for one batch-fetch invocation. Defaults are tuned for the
/// public games API rate budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retry_on_statuses: Vec<u16>,
    pub request_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
            min_interval_ms: 250,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            retry_on_statuses: vec![408, 429, 500, 502, 503, 504],
            request_timeout_secs: 30,
        }
    }
}
