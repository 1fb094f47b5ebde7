// Shared test fixture for EventByteStream.
// Compiled into the crate only during tests, exposed under
// `crate::test_support::fixtures::streams`.

use crate::core::stream::EventByteStream;
use serde::Deserialize;
use std::fs;

// JSON -> DTO (transport shape)
#[derive(Debug, Clone, Deserialize)]
pub struct EventByteStreamDto {
    pub aggregate_root_id: String,
    pub aggregate_root_name: String,
    pub commit_id: String,
    pub version: i64,
    pub payload: String,
}

pub struct EventByteStreamBuilder {
    inner: EventByteStream,
}

impl Default for EventByteStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl EventByteStreamBuilder {
    pub fn new() -> Self {
        let json_str =
            fs::read_to_string("./src/test_support/fixtures/streams/json/event_byte_stream.json")
                .unwrap();
        let dto: EventByteStreamDto = serde_json::from_str(&json_str).unwrap();

        Self {
            inner: EventByteStream {
                aggregate_root_id: dto.aggregate_root_id,
                aggregate_root_name: dto.aggregate_root_name,
                commit_id: dto.commit_id,
                version: dto.version,
                payload: dto.payload.into_bytes(),
            },
        }
    }

    pub fn aggregate_root_id(mut self, v: impl Into<String>) -> Self {
        self.inner.aggregate_root_id = v.into();
        self
    }

    pub fn aggregate_root_name(mut self, v: impl Into<String>) -> Self {
        self.inner.aggregate_root_name = v.into();
        self
    }

    pub fn commit_id(mut self, v: impl Into<String>) -> Self {
        self.inner.commit_id = v.into();
        self
    }

    pub fn version(mut self, v: i64) -> Self {
        self.inner.version = v;
        self
    }

    pub fn payload(mut self, v: impl Into<Vec<u8>>) -> Self {
        self.inner.payload = v.into();
        self
    }

    pub fn build(self) -> EventByteStream {
        self.inner
    }
}

/// Versions 1..=count for one aggregate, with commit ids `{aggregate_root_id}-commit-{version}`.
pub fn make_event_byte_streams(aggregate_root_id: &str, count: i64) -> Vec<EventByteStream> {
    (1..=count)
        .map(|version| {
            EventByteStreamBuilder::new()
                .aggregate_root_id(aggregate_root_id)
                .commit_id(format!("{aggregate_root_id}-commit-{version}"))
                .version(version)
                .payload(format!("{{\"version\":{version}}}"))
                .build()
        })
        .collect()
}
