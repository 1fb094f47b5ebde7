use crate::config::ConfigError;
use crate::core::ports::CommitLogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("event store is not available")]
    Unavailable,

    #[error(
        "concurrency conflict on aggregate {aggregate_root_id}: version {version}, current version {current_version:?}"
    )]
    ConcurrencyConflict {
        aggregate_root_id: String,
        version: i64,
        /// None when the attempt lost the gate before reading the index.
        current_version: Option<i64>,
    },

    #[error("duplicate aggregate [name={aggregate_root_name}, id={aggregate_root_id}] creation")]
    DuplicateAggregateCreation {
        aggregate_root_name: String,
        aggregate_root_id: String,
    },

    #[error("internal consistency: {0}")]
    InternalConsistency(String),

    #[error("initialization failed: {0}")]
    InitializationFailure(Box<EventStoreError>),

    #[error(transparent)]
    CommitLog(#[from] CommitLogError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EventStoreError {
    /// Conflicts a command pipeline resolves by reloading the aggregate and resubmitting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EventStoreError::ConcurrencyConflict { .. }
                | EventStoreError::DuplicateAggregateCreation { .. }
        )
    }
}
