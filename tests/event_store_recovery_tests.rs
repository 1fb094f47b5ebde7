// End to end in memory tests for committing, restarting and recovering the event store.
//
// Responsibilities
// - Commit through one store, then rebuild fresh stores over the same commit log.
// - Assert that recovered stores agree with each other and with what was committed.

use aggregate_event_store::adapters::in_memory::in_memory_commit_log::InMemoryCommitLog;
use aggregate_event_store::application::event_store::EventStore;
use aggregate_event_store::config::EventStoreConfig;
use aggregate_event_store::core::stream::{EventByteStream, EventCommitStatus};
use rstest::{fixture, rstest};
use std::sync::Arc;

const AGGREGATES: [&str; 3] = ["account-1", "account-2", "account-3"];

fn stream(aggregate_root_id: &str, version: i64) -> EventByteStream {
    EventByteStream {
        aggregate_root_id: aggregate_root_id.to_string(),
        aggregate_root_name: "BankAccount".to_string(),
        commit_id: format!("{aggregate_root_id}-{version}"),
        version,
        payload: format!("{{\"deposit\":{}}}", version * 10).into_bytes(),
    }
}

#[fixture]
async fn committed_log() -> Arc<InMemoryCommitLog> {
    let log = Arc::new(InMemoryCommitLog::new());
    let store = EventStore::new(log.clone());
    store.initialize().await.unwrap();
    // Interleave aggregates so one page holds several of them.
    for version in 1..=4 {
        for (position, id) in AGGREGATES.iter().enumerate() {
            if version <= position as i64 + 2 {
                assert_eq!(
                    store.commit(&stream(id, version)).await.unwrap(),
                    EventCommitStatus::Success
                );
            }
        }
    }
    log
}

async fn recovered(log: Arc<InMemoryCommitLog>, page_size: usize) -> EventStore<InMemoryCommitLog> {
    let store = EventStore::with_config(
        log,
        EventStoreConfig {
            recovery_page_size: page_size,
        },
    );
    store.initialize().await.unwrap();
    store
}

#[rstest]
#[tokio::test]
async fn it_should_recover_every_aggregate_history(
    #[future] committed_log: Arc<InMemoryCommitLog>,
) {
    let log = committed_log.await;
    let store = recovered(log.clone(), 2).await;

    for (position, id) in AGGREGATES.iter().enumerate() {
        let expected_version = position as i64 + 2;
        assert_eq!(store.current_version(id).await, Some(expected_version));
        let history = store.query(id, "BankAccount", 1, expected_version).await.unwrap();
        let expected: Vec<_> = (1..=expected_version).map(|v| stream(id, v)).collect();
        assert_eq!(history, expected);
        for version in 1..=expected_version {
            let found = store
                .get_event_stream(id, &format!("{id}-{version}"))
                .await
                .unwrap();
            assert_eq!(found, Some(stream(id, version)));
        }
    }
    assert_eq!(log.len().await, 9);
}

#[rstest]
#[tokio::test]
async fn it_should_recover_the_same_state_twice(#[future] committed_log: Arc<InMemoryCommitLog>) {
    let log = committed_log.await;
    let first = recovered(log.clone(), 1000).await;
    let second = recovered(log.clone(), 3).await;

    for id in AGGREGATES {
        assert_eq!(first.current_version(id).await, second.current_version(id).await);
        assert_eq!(
            first.query(id, "BankAccount", 1, 10).await.unwrap(),
            second.query(id, "BankAccount", 1, 10).await.unwrap()
        );
    }
}

#[rstest]
#[tokio::test]
async fn it_should_continue_committing_after_a_restart(
    #[future] committed_log: Arc<InMemoryCommitLog>,
) {
    let log = committed_log.await;
    let store = recovered(log.clone(), 1000).await;

    assert_eq!(
        store.commit(&stream("account-1", 1)).await.unwrap(),
        EventCommitStatus::DuplicateCommit
    );
    assert!(store.commit(&stream("account-1", 2)).await.is_ok());
    assert_eq!(
        store.commit(&stream("account-1", 3)).await.unwrap(),
        EventCommitStatus::Success
    );
    assert_eq!(store.current_version("account-1").await, Some(3));
    assert_eq!(log.len().await, 10);
}
