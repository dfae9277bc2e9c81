//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Cycle-fatal failures. Any of these aborts the current ingestion cycle;
/// none are retried inside the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network error, timeout, or non-success status from the gateway.
    #[error("Telemetry gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Gateway answered but the payload lacks the minimum data.
    #[error("Telemetry gateway returned a malformed payload: {0}")]
    GatewayMalformed(String),

    /// A required field is missing, not numeric, or negative.
    #[error("Failed to normalize reading: {0}")]
    Normalization(String),

    /// A store write or read failed.
    #[error("Persistence failed: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for PipelineError {
    /// A reading refused for going backwards in time is the gateway's fault,
    /// not the store's.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OutOfOrder(m) => PipelineError::GatewayMalformed(m),
            other => PipelineError::Persistence(other),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PipelineError::GatewayMalformed(err.to_string())
        } else {
            PipelineError::GatewayUnavailable(err.to_string())
        }
    }
}

/// Errors raised by [`crate::store::Store`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back to a model.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("{0}")]
    Unavailable(String),

    /// Insert refused: the reading predates the newest stored one.
    #[error("{0}")]
    OutOfOrder(String),
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_store_error_wraps_into_persistence() {
        // ---
        let err: PipelineError = StoreError::Unavailable("disk full".into()).into();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(err.to_string(), "Persistence failed: disk full");
    }

    #[test]
    fn test_out_of_order_reading_is_malformed_feed() {
        // ---
        let err: PipelineError = StoreError::OutOfOrder("went backwards".into()).into();
        assert!(matches!(err, PipelineError::GatewayMalformed(_)));
    }
}
