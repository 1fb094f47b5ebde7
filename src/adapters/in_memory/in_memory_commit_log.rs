// In memory implementation of the CommitLog port.
//
// Purpose
// - Support event store tests and local development without a storage engine.
//
// Responsibilities
// - Assign sequences starting at 1, one per append.
// - Serve point lookups by sequence and forward pages by 1-based position.
// - Simulate an offline backend, slow appends and a lost record on demand.

use crate::core::ports::{CommitLog, CommitLogError};
use crate::core::stream::{CommitRecord, EventByteStream};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCommitLog {
    records: RwLock<Vec<CommitRecord>>,
    forgotten: RwLock<HashSet<i64>>,
    is_offline: AtomicBool,
    delay_append_ms: AtomicU64,
}

impl InMemoryCommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the log with records that were persisted earlier, ordered by sequence.
    pub fn with_records(mut records: Vec<CommitRecord>) -> Self {
        records.sort_by_key(|record| record.commit_sequence);
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    pub fn toggle_offline(&self) {
        self.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    pub fn set_delay_append_ms(&self, ms: u64) {
        self.delay_append_ms.store(ms, Ordering::SeqCst);
    }

    /// Point lookups for this sequence resolve to nothing from now on. Paging is unaffected.
    pub async fn forget(&self, commit_sequence: i64) {
        self.forgotten.write().await.insert(commit_sequence);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn ensure_online(&self) -> Result<(), CommitLogError> {
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(CommitLogError::Backend("Commit log offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CommitLog for InMemoryCommitLog {
    async fn append(&self, stream: &EventByteStream) -> Result<i64, CommitLogError> {
        self.ensure_online()?;
        let delay = self.delay_append_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let mut guard = self.records.write().await;
        let commit_sequence = guard.last().map_or(1, |last| last.commit_sequence + 1);
        guard.push(CommitRecord::new(commit_sequence, stream.clone()));
        Ok(commit_sequence)
    }

    async fn get(&self, commit_sequence: i64) -> Result<Option<EventByteStream>, CommitLogError> {
        self.ensure_online()?;
        if self.forgotten.read().await.contains(&commit_sequence) {
            return Ok(None);
        }
        let guard = self.records.read().await;
        Ok(guard
            .binary_search_by_key(&commit_sequence, |record| record.commit_sequence)
            .ok()
            .map(|position| guard[position].to_stream()))
    }

    async fn query(
        &self,
        start: i64,
        page_size: usize,
    ) -> Result<Vec<CommitRecord>, CommitLogError> {
        self.ensure_online()?;
        let skip = usize::try_from(start.max(1) - 1).unwrap_or(usize::MAX);
        let guard = self.records.read().await;
        Ok(guard.iter().skip(skip).take(page_size).cloned().collect())
    }
}
