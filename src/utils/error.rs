use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Malformed JSON response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<EnrichError>,
    },

    #[error("Batch chunk {chunk_index} failed: {source}")]
    ChunkFailed {
        chunk_index: usize,
        #[source]
        source: Box<EnrichError>,
    },

    #[error("Worker task failed: {message}")]
    Task { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl EnrichError {
    /// A failure is retryable when it is network-level or an HTTP status
    /// the caller opted into. Everything else fails fast.
    pub fn is_retryable(&self, retry_on: &HashSet<u16>) -> bool {
        match self {
            EnrichError::Network(_) => true,
            EnrichError::HttpStatus { status, .. } => retry_on.contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_retryable_only_when_configured() {
        let retry_on: HashSet<u16> = [429, 500, 502, 503].into_iter().collect();

        let transient = EnrichError::HttpStatus {
            status: 503,
            url: "http://api.test/votes".to_string(),
        };
        assert!(transient.is_retryable(&retry_on));

        let permanent = EnrichError::HttpStatus {
            status: 404,
            url: "http://api.test/votes".to_string(),
        };
        assert!(!permanent.is_retryable(&retry_on));
    }

    #[test]
    fn test_malformed_response_never_retryable() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = EnrichError::MalformedResponse {
            url: "http://api.test/votes".to_string(),
            source: parse_err,
        };
        let retry_on: HashSet<u16> = [500].into_iter().collect();
        assert!(!err.is_retryable(&retry_on));
    }
}
