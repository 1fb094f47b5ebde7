// Rebuilds the per aggregate version indexes from the commit log.
//
// Purpose
// - Make a restarted store answer exactly as it did before the restart.
//
// Responsibilities
// - Page through the whole log in order, visiting every record once.
// - Treat a repeated version or commit id, or a version gap, for an aggregate as a fatal
//   inconsistency.
//
// Boundaries
// - Builds a fresh table in isolation. Installing it and flipping availability is the store's job.

use crate::application::errors::EventStoreError;
use crate::config::EventStoreConfig;
use crate::core::ports::CommitLog;
use crate::core::version_index::VersionState;
use std::collections::HashMap;
use tracing::{debug, error};

/// Log positions are 1-based.
pub const FIRST_POSITION: i64 = 1;

pub type IndexTable = HashMap<String, VersionState>;

pub async fn replay_commit_log<TCommitLog>(
    commit_log: &TCommitLog,
    page_size: usize,
) -> Result<IndexTable, EventStoreError>
where
    TCommitLog: CommitLog + ?Sized,
{
    EventStoreConfig {
        recovery_page_size: page_size,
    }
    .validate()?;

    let mut table = IndexTable::new();
    let mut start = FIRST_POSITION;
    let mut replayed = 0usize;

    loop {
        let page = commit_log.query(start, page_size).await?;
        let page_len = page.len();
        debug!(start, page_len, "replaying commit log page");

        for record in page {
            let state = table.entry(record.aggregate_root_id.clone()).or_default();
            if let Err(collision) =
                state.replay(record.version, &record.commit_id, record.commit_sequence)
            {
                let message =
                    format!("invalid commit record {record} found when recovering: {collision}");
                error!(%message, "event store recovery aborted");
                return Err(EventStoreError::InternalConsistency(message));
            }
        }
        replayed += page_len;

        if page_len < page_size {
            break;
        }
        start += page_len as i64;
    }

    debug!(replayed, aggregates = table.len(), "commit log replay finished");
    Ok(table)
}

#[cfg(test)]
mod commit_log_replay_tests {
    use super::*;
    use crate::adapters::in_memory::in_memory_commit_log::InMemoryCommitLog;
    use crate::config::ConfigError;
    use crate::core::ports::CommitLogError;
    use crate::core::stream::{CommitRecord, EventByteStream};
    use crate::test_support::fixtures::streams::event_byte_stream::{
        EventByteStreamBuilder, make_event_byte_streams,
    };
    use rstest::rstest;

    async fn seeded_log(streams: Vec<EventByteStream>) -> InMemoryCommitLog {
        let log = InMemoryCommitLog::new();
        for stream in &streams {
            log.append(stream).await.expect("seed append failed");
        }
        log
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_return_an_empty_table_for_an_empty_log() {
        let log = InMemoryCommitLog::new();
        let table = replay_commit_log(&log, 1000).await.unwrap();
        assert!(table.is_empty());
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(1000)]
    #[tokio::test]
    async fn it_should_visit_every_record_once_whatever_the_page_size(#[case] page_size: usize) {
        let a = make_event_byte_streams("note-a", 3);
        let b = make_event_byte_streams("note-b", 2);
        let interleaved = vec![
            a[0].clone(),
            b[0].clone(),
            a[1].clone(),
            b[1].clone(),
            a[2].clone(),
        ];
        let log = seeded_log(interleaved).await;

        let table = replay_commit_log(&log, page_size).await.unwrap();

        assert_eq!(table.len(), 2);
        let a = &table["note-a"];
        let b = &table["note-b"];
        assert_eq!(a.current_version, 3);
        assert_eq!(a.commit_count(), 3);
        assert_eq!(b.current_version, 2);
        assert_eq!(b.commit_count(), 2);
        assert_eq!(a.sequence_of_version(1), Some(1));
        assert_eq!(b.sequence_of_version(1), Some(2));
        assert_eq!(a.sequence_of_commit("note-a-commit-3"), Some(5));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_abort_on_a_duplicate_version() {
        let first = EventByteStreamBuilder::new().commit_id("c-1").build();
        let second = EventByteStreamBuilder::new().commit_id("c-2").build();
        let log = InMemoryCommitLog::with_records(vec![
            CommitRecord::new(1, first),
            CommitRecord::new(2, second),
        ]);

        let result = replay_commit_log(&log, 1000).await;

        match result {
            Err(EventStoreError::InternalConsistency(message)) => {
                assert!(message.contains("commit_id=c-2"));
                assert!(message.contains("version 1 is already mapped to sequence 1"));
            }
            other => panic!("expected InternalConsistency, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_abort_on_a_duplicate_commit_id() {
        let first = EventByteStreamBuilder::new().commit_id("c-1").build();
        let second = EventByteStreamBuilder::new().commit_id("c-1").version(2).build();
        let log = InMemoryCommitLog::with_records(vec![
            CommitRecord::new(1, first),
            CommitRecord::new(2, second),
        ]);

        let result = replay_commit_log(&log, 1).await;

        assert!(matches!(result, Err(EventStoreError::InternalConsistency(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_abort_on_a_version_gap() {
        let first = EventByteStreamBuilder::new().commit_id("c-1").build();
        let third = EventByteStreamBuilder::new().commit_id("c-3").version(3).build();
        let log = InMemoryCommitLog::with_records(vec![
            CommitRecord::new(1, first),
            CommitRecord::new(2, third),
        ]);

        let result = replay_commit_log(&log, 1000).await;

        match result {
            Err(EventStoreError::InternalConsistency(message)) => {
                assert!(message.contains("version 3 does not follow current version 1"));
            }
            other => panic!("expected InternalConsistency, got {other:?}"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_a_zero_page_size_instead_of_reading_nothing() {
        let log = seeded_log(make_event_byte_streams("note-a", 2)).await;

        let result = replay_commit_log(&log, 0).await;

        assert!(matches!(
            result,
            Err(EventStoreError::Config(ConfigError::InvalidPageSize { .. }))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_if_the_commit_log_is_offline() {
        let log = InMemoryCommitLog::new();
        log.toggle_offline();
        let result = replay_commit_log(&log, 1000).await;
        assert!(matches!(
            result,
            Err(EventStoreError::CommitLog(CommitLogError::Backend(_)))
        ));
    }
}
