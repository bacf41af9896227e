use crate::foundation::core::WorkerId;

/// Convenience result type used across raypool.
pub type RaypoolResult<T> = Result<T, RaypoolError>;

/// Top-level error taxonomy used by scheduling and compositing APIs.
///
/// Every failure surfaces to the caller of the render entry point; nothing in this crate retries.
#[derive(thiserror::Error, Debug)]
pub enum RaypoolError {
    /// Invalid user-provided request or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A worker failed to start or to receive shared resources. No partial pool is exposed.
    #[error("initialization error: worker {worker}: {reason}")]
    Initialization {
        /// Worker that failed to come up.
        worker: WorkerId,
        /// Failure description.
        reason: String,
    },

    /// Scheduler invariant violation (a programming error, never recoverable).
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// A worker errored while processing a unit; the whole request fails.
    #[error("worker error: worker {worker}: {reason}")]
    Worker {
        /// Worker that reported the failure.
        worker: WorkerId,
        /// Failure description.
        reason: String,
    },

    /// Partial buffer sizes disagree with the request geometry.
    #[error("aggregation mismatch: {0}")]
    AggregationMismatch(String),

    /// A previous request still has units in flight on this context.
    #[error("context busy: {0}")]
    Busy(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RaypoolError {
    /// Build a [`RaypoolError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RaypoolError::Initialization`] value.
    pub fn initialization(worker: WorkerId, reason: impl Into<String>) -> Self {
        Self::Initialization {
            worker,
            reason: reason.into(),
        }
    }

    /// Build a [`RaypoolError::Dispatch`] value.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Build a [`RaypoolError::Worker`] value.
    pub fn worker(worker: WorkerId, reason: impl Into<String>) -> Self {
        Self::Worker {
            worker,
            reason: reason.into(),
        }
    }

    /// Build a [`RaypoolError::AggregationMismatch`] value.
    pub fn aggregation_mismatch(msg: impl Into<String>) -> Self {
        Self::AggregationMismatch(msg.into())
    }

    /// Build a [`RaypoolError::Busy`] value.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Build a [`RaypoolError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
