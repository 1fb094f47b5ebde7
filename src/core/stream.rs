// Committed event payloads as the store sees them.
//
// Purpose
// - Describe one commit of an aggregate root: identity, idempotency key, version and opaque payload.
//
// Boundaries
// - The payload is never inspected here. Serialization of domain events happens upstream.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventByteStream {
    pub aggregate_root_id: String,
    pub aggregate_root_name: String,
    pub commit_id: String,
    /// 1-based and contiguous per aggregate root.
    pub version: i64,
    pub payload: Vec<u8>,
}

/// The durable form of a commit, as returned when paging through the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_sequence: i64,
    pub aggregate_root_id: String,
    pub aggregate_root_name: String,
    pub commit_id: String,
    pub version: i64,
    pub payload: Vec<u8>,
}

impl CommitRecord {
    pub fn new(commit_sequence: i64, stream: EventByteStream) -> Self {
        Self {
            commit_sequence,
            aggregate_root_id: stream.aggregate_root_id,
            aggregate_root_name: stream.aggregate_root_name,
            commit_id: stream.commit_id,
            version: stream.version,
            payload: stream.payload,
        }
    }

    pub fn to_stream(&self) -> EventByteStream {
        EventByteStream {
            aggregate_root_id: self.aggregate_root_id.clone(),
            aggregate_root_name: self.aggregate_root_name.clone(),
            commit_id: self.commit_id.clone(),
            version: self.version,
            payload: self.payload.clone(),
        }
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[sequence={}, aggregate={}:{}, commit_id={}, version={}]",
            self.commit_sequence,
            self.aggregate_root_name,
            self.aggregate_root_id,
            self.commit_id,
            self.version
        )
    }
}

/// Outcome of an admitted commit call. Rejections are errors, not statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCommitStatus {
    Success,
    /// The commit id was already admitted for this aggregate. Nothing was written.
    DuplicateCommit,
}
