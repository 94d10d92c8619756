//! Error types for the market data pipeline.

use thiserror::Error;

/// Top-level pipeline error.
///
/// Only batch-setup failures surface as this type to callers of the
/// collection and indicator operations; per-instrument failures are folded
/// into the batch counters.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market data source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Invalid credential: {0}")]
    Credential(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by a market data provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider} returned an error (status {status}): {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },
}

impl SourceError {
    /// Whether the provider signalled throttling. This is the only
    /// error class that is retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

/// Errors raised by the price store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {instrument} on {date}")]
    NotFound { instrument: String, date: String },

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Errors raised while reconciling a fetched batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Invalid trading date '{0}'")]
    InvalidDate(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_retryable() {
        let limited = SourceError::RateLimited {
            provider: "KIS".into(),
            message: "EGW00201".into(),
        };
        let other = SourceError::Provider {
            provider: "KIS".into(),
            status: 500,
            message: "internal".into(),
        };

        assert!(limited.is_rate_limited());
        assert!(!other.is_rate_limited());
        assert!(!SourceError::Parse("bad json".into()).is_rate_limited());
    }

    #[test]
    fn test_source_error_converts_to_collector_error() {
        let err: CollectorError = SourceError::Connection("timed out".into()).into();
        assert!(matches!(err, CollectorError::Source(SourceError::Connection(_))));
    }
}
