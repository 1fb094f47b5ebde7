// Event store orchestrating commit admission, reads and recovery.
//
// Purpose
// - Admit at most one commit per aggregate version and remember where each commit lives in the log.
//
// Responsibilities
// - Reject everything until the log has been replayed.
// - Fail fast when another commit for the same aggregate is in flight.
// - Treat a resubmitted commit id as an idempotent no-op.
// - Never return a partial history when index and log disagree.

use crate::application::errors::EventStoreError;
use crate::application::recovery::replay_commit_log;
use crate::config::EventStoreConfig;
use crate::core::ports::CommitLog;
use crate::core::stream::{EventByteStream, EventCommitStatus};
use crate::core::version_index::AggregateVersionIndex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub struct EventStore<TCommitLog>
where
    TCommitLog: CommitLog + 'static,
{
    commit_log: Arc<TCommitLog>,
    config: EventStoreConfig,
    aggregates: RwLock<HashMap<String, Arc<AggregateVersionIndex>>>,
    is_available: AtomicBool,
}

impl<TCommitLog> EventStore<TCommitLog>
where
    TCommitLog: CommitLog + 'static,
{
    pub fn new(commit_log: Arc<TCommitLog>) -> Self {
        Self::with_config(commit_log, EventStoreConfig::default())
    }

    pub fn with_config(commit_log: Arc<TCommitLog>, config: EventStoreConfig) -> Self {
        Self {
            commit_log,
            config,
            aggregates: RwLock::new(HashMap::new()),
            is_available: AtomicBool::new(false),
        }
    }

    pub fn is_available(&self) -> bool {
        self.is_available.load(Ordering::Acquire)
    }

    /// Replays the commit log and opens the store. On failure the store stays unavailable and
    /// keeps no index entries.
    pub async fn initialize(&self) -> Result<(), EventStoreError> {
        let table = replay_commit_log(&*self.commit_log, self.config.recovery_page_size)
            .await
            .map_err(|e| {
                error!(error = %e, "event store recovery failed");
                EventStoreError::InitializationFailure(Box::new(e))
            })?;

        let aggregate_count = table.len();
        *self.aggregates.write().await = table
            .into_iter()
            .map(|(id, state)| (id, Arc::new(AggregateVersionIndex::from_state(state))))
            .collect();
        self.is_available.store(true, Ordering::Release);
        info!(aggregate_count, "event store is available");
        Ok(())
    }

    pub async fn commit(
        &self,
        stream: &EventByteStream,
    ) -> Result<EventCommitStatus, EventStoreError> {
        self.ensure_available()?;

        let index = self.get_or_create(&stream.aggregate_root_id).await;
        let Some(_gate) = index.try_begin_edit() else {
            warn!(
                aggregate_root_id = %stream.aggregate_root_id,
                commit_id = %stream.commit_id,
                version = stream.version,
                "commit rejected, another commit is in flight"
            );
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_root_id: stream.aggregate_root_id.clone(),
                version: stream.version,
                current_version: None,
            });
        };

        let (current_version, is_next) = {
            let state = index.read_state();
            if state.contains_commit(&stream.commit_id) {
                debug!(
                    aggregate_root_id = %stream.aggregate_root_id,
                    commit_id = %stream.commit_id,
                    "duplicate commit ignored"
                );
                return Ok(EventCommitStatus::DuplicateCommit);
            }
            (state.current_version, state.is_next_version(stream.version))
        };

        if is_next {
            let commit_sequence = self.commit_log.append(stream).await?;
            // No await between the append returning and the index update.
            index
                .write_state()
                .record(stream.version, &stream.commit_id, commit_sequence);
            debug!(
                aggregate_root_id = %stream.aggregate_root_id,
                commit_id = %stream.commit_id,
                version = stream.version,
                commit_sequence,
                "commit appended"
            );
            return Ok(EventCommitStatus::Success);
        }

        if stream.version == 1 {
            warn!(
                aggregate_root_name = %stream.aggregate_root_name,
                aggregate_root_id = %stream.aggregate_root_id,
                current_version,
                "duplicate aggregate creation rejected"
            );
            return Err(EventStoreError::DuplicateAggregateCreation {
                aggregate_root_name: stream.aggregate_root_name.clone(),
                aggregate_root_id: stream.aggregate_root_id.clone(),
            });
        }

        warn!(
            aggregate_root_id = %stream.aggregate_root_id,
            version = stream.version,
            current_version,
            "commit rejected, version is not the next one"
        );
        Err(EventStoreError::ConcurrencyConflict {
            aggregate_root_id: stream.aggregate_root_id.clone(),
            version: stream.version,
            current_version: Some(current_version),
        })
    }

    pub async fn get_event_stream(
        &self,
        aggregate_root_id: &str,
        commit_id: &str,
    ) -> Result<Option<EventByteStream>, EventStoreError> {
        self.ensure_available()?;
        let Some(index) = self.find(aggregate_root_id).await else {
            return Ok(None);
        };
        let Some(commit_sequence) = index.read_state().sequence_of_commit(commit_id) else {
            return Ok(None);
        };
        Ok(self.commit_log.get(commit_sequence).await?)
    }

    /// Streams for versions in `[min_version, max_version]`, clamped to what exists, ascending.
    pub async fn query(
        &self,
        aggregate_root_id: &str,
        aggregate_root_name: &str,
        min_version: i64,
        max_version: i64,
    ) -> Result<Vec<EventByteStream>, EventStoreError> {
        self.ensure_available()?;
        let Some(index) = self.find(aggregate_root_id).await else {
            return Ok(Vec::new());
        };

        let sequences = {
            let state = index.read_state();
            let min_version = min_version.max(1);
            let max_version = max_version.min(state.current_version);
            (min_version..=max_version)
                .map(|version| {
                    state
                        .sequence_of_version(version)
                        .map(|sequence| (version, sequence))
                        .ok_or_else(|| {
                            consistency_fault(format!(
                                "version {version} of aggregate [name={aggregate_root_name}, id={aggregate_root_id}] has no commit sequence"
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut streams = Vec::with_capacity(sequences.len());
        for (version, commit_sequence) in sequences {
            match self.commit_log.get(commit_sequence).await? {
                Some(stream) => streams.push(stream),
                None => {
                    return Err(consistency_fault(format!(
                        "event byte stream cannot be found from commit log, commit sequence: {commit_sequence}, aggregate [name={aggregate_root_name}, id={aggregate_root_id}, version={version}]"
                    )));
                }
            }
        }
        Ok(streams)
    }

    /// Not backed by a log scan; always empty.
    pub fn query_all(&self) -> Vec<EventByteStream> {
        Vec::new()
    }

    pub async fn current_version(&self, aggregate_root_id: &str) -> Option<i64> {
        let index = self.find(aggregate_root_id).await?;
        let current_version = index.read_state().current_version;
        Some(current_version)
    }

    fn ensure_available(&self) -> Result<(), EventStoreError> {
        if !self.is_available() {
            return Err(EventStoreError::Unavailable);
        }
        Ok(())
    }

    async fn find(&self, aggregate_root_id: &str) -> Option<Arc<AggregateVersionIndex>> {
        self.aggregates.read().await.get(aggregate_root_id).cloned()
    }

    async fn get_or_create(&self, aggregate_root_id: &str) -> Arc<AggregateVersionIndex> {
        if let Some(index) = self.find(aggregate_root_id).await {
            return index;
        }
        self.aggregates
            .write()
            .await
            .entry(aggregate_root_id.to_string())
            .or_default()
            .clone()
    }
}

fn consistency_fault(message: String) -> EventStoreError {
    error!(%message, "event store index and commit log disagree");
    EventStoreError::InternalConsistency(message)
}
