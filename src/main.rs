// Composition root.
//
// Responsibilities
// - Read config from the environment.
// - Wire the in memory commit log into the event store and recover it.
// - Run a short commit walkthrough so the store can be exercised from the command line.

use aggregate_event_store::adapters::in_memory::in_memory_commit_log::InMemoryCommitLog;
use aggregate_event_store::application::event_store::EventStore;
use aggregate_event_store::config::EventStoreConfig;
use aggregate_event_store::core::stream::EventByteStream;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = EventStoreConfig::from_env()?;
    let commit_log = Arc::new(InMemoryCommitLog::new());
    let store = EventStore::with_config(commit_log, config);
    store.initialize().await?;

    let aggregate_root_id = Uuid::now_v7().to_string();
    let commits = [
        (Uuid::now_v7().to_string(), 1),
        (Uuid::now_v7().to_string(), 2),
    ];
    for (commit_id, version) in &commits {
        let stream = EventByteStream {
            aggregate_root_id: aggregate_root_id.clone(),
            aggregate_root_name: "Note".to_string(),
            commit_id: commit_id.clone(),
            version: *version,
            payload: format!("{{\"version\":{version}}}").into_bytes(),
        };
        let status = store.commit(&stream).await?;
        tracing::info!(%aggregate_root_id, %commit_id, version, ?status, "commit");
    }

    let retry = EventByteStream {
        aggregate_root_id: aggregate_root_id.clone(),
        aggregate_root_name: "Note".to_string(),
        commit_id: commits[0].0.clone(),
        version: 1,
        payload: Vec::new(),
    };
    let status = store.commit(&retry).await?;
    tracing::info!(%aggregate_root_id, ?status, "resubmitted first commit");

    let history = store.query(&aggregate_root_id, "Note", 1, i64::MAX).await?;
    tracing::info!(%aggregate_root_id, versions = history.len(), "history loaded");
    Ok(())
}
