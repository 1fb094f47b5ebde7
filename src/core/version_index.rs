// Per aggregate root version index.
//
// Purpose
// - Remember, for one aggregate root, which log sequence holds each version and each commit id.
// - Gate commit attempts so at most one is in flight per aggregate root.
//
// Responsibilities
// - Keep `version_to_sequence` keys contiguous from 1 to `current_version`.
// - Apply the version, commit id and current version updates as one step for readers.
// - Never hold the state lock across an await, so an admitted append is always indexed.
//
// Boundaries
// - No input or output. The event store decides what gets appended; this only records it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexCollision {
    #[error("version {version} is already mapped to sequence {existing_sequence}")]
    Version { version: i64, existing_sequence: i64 },

    #[error("commit id {commit_id} is already mapped to sequence {existing_sequence}")]
    CommitId {
        commit_id: String,
        existing_sequence: i64,
    },

    #[error("version {version} does not follow current version {current_version}")]
    NotContiguous { version: i64, current_version: i64 },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VersionState {
    pub current_version: i64,
    version_to_sequence: HashMap<i64, i64>,
    commit_id_to_sequence: HashMap<String, i64>,
}

impl VersionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_commit(&self, commit_id: &str) -> bool {
        self.commit_id_to_sequence.contains_key(commit_id)
    }

    pub fn sequence_of_commit(&self, commit_id: &str) -> Option<i64> {
        self.commit_id_to_sequence.get(commit_id).copied()
    }

    pub fn sequence_of_version(&self, version: i64) -> Option<i64> {
        self.version_to_sequence.get(&version).copied()
    }

    pub fn commit_count(&self) -> usize {
        self.commit_id_to_sequence.len()
    }

    /// True when `version` is the one an admitted commit must carry next.
    pub fn is_next_version(&self, version: i64) -> bool {
        self.current_version.checked_add(1) == Some(version)
    }

    /// Records a commit that was just admitted and appended. Maps first, then the version.
    pub fn record(&mut self, version: i64, commit_id: &str, commit_sequence: i64) {
        self.version_to_sequence.insert(version, commit_sequence);
        self.commit_id_to_sequence
            .insert(commit_id.to_string(), commit_sequence);
        self.current_version = version;
    }

    /// Records a commit read back from the log. Existing keys are never overwritten.
    pub fn replay(
        &mut self,
        version: i64,
        commit_id: &str,
        commit_sequence: i64,
    ) -> Result<(), IndexCollision> {
        if let Some(existing_sequence) = self.sequence_of_version(version) {
            return Err(IndexCollision::Version {
                version,
                existing_sequence,
            });
        }
        if let Some(existing_sequence) = self.sequence_of_commit(commit_id) {
            return Err(IndexCollision::CommitId {
                commit_id: commit_id.to_string(),
                existing_sequence,
            });
        }
        if !self.is_next_version(version) {
            return Err(IndexCollision::NotContiguous {
                version,
                current_version: self.current_version,
            });
        }
        self.record(version, commit_id, commit_sequence);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AggregateVersionIndex {
    editing: AtomicBool,
    state: RwLock<VersionState>,
}

impl AggregateVersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: VersionState) -> Self {
        Self {
            editing: AtomicBool::new(false),
            state: RwLock::new(state),
        }
    }

    /// Flips the gate from free to busy. Returns None when another attempt already holds it;
    /// the caller is expected to fail rather than wait.
    pub fn try_begin_edit(&self) -> Option<EditGate<'_>> {
        self.editing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| EditGate { index: self })
    }

    pub fn is_editing(&self) -> bool {
        self.editing.load(Ordering::Acquire)
    }

    /// Guards are synchronous; drop them before the next await.
    pub fn read_state(&self) -> RwLockReadGuard<'_, VersionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_state(&self) -> RwLockWriteGuard<'_, VersionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the whole admission of one commit. Dropping it frees the gate on every exit path.
#[derive(Debug)]
pub struct EditGate<'a> {
    index: &'a AggregateVersionIndex,
}

impl Drop for EditGate<'_> {
    fn drop(&mut self) {
        self.index.editing.store(false, Ordering::Release);
    }
}
