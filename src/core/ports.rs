// Ports define what the store needs from the outside world, without implementing it.
//
// Purpose
// - Describe the append-only commit log the store persists to and replays from.
//
// Boundaries
// - No concrete input or output here. Adapters implement this trait in the adapters layer.
//
// Testing guidance
// - Use the in memory commit log for tests and local development.

use crate::core::stream::{CommitRecord, EventByteStream};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitLogError {
    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait CommitLog: Send + Sync {
    /// Persists the stream and returns its newly assigned sequence. Sequences strictly increase
    /// and are never reused.
    async fn append(&self, stream: &EventByteStream) -> Result<i64, CommitLogError>;

    async fn get(&self, commit_sequence: i64) -> Result<Option<EventByteStream>, CommitLogError>;

    /// Returns at most `page_size` records in log order, starting at the 1-based `start` position.
    async fn query(
        &self,
        start: i64,
        page_size: usize,
    ) -> Result<Vec<CommitRecord>, CommitLogError>;
}
