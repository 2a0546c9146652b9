//! Store contract consumed by the gateway.
//!
//! The gateway owns no persistent state; everything durable lives behind
//! `EventStore`. The gateway never retries a store call and never
//! interprets `Backend` failures.

use async_trait::async_trait;

use crate::domain::{Dc, Event, EventQuery, NewTopic, TimeQuery, Topic, UnaddedEvent};

pub mod memory;

pub use memory::MemoryEventStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Per-item callback for incremental id streaming. The store calls `emit`
/// once per matching event id; an error from the sink aborts the loop and
/// is returned to the store's caller.
#[async_trait]
pub trait EventIdSink: Send {
    async fn emit(&mut self, event_id: &str) -> Result<()>;
}

/// Interface for event persistence and querying.
///
/// Implementations:
/// - `MemoryEventStore`: in-memory store, also used as the test double
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one event; returns the store-assigned id.
    async fn create_event(&self, event: UnaddedEvent) -> Result<String>;

    /// Look one event up by id.
    async fn find_event_by_id(&self, id: &str) -> Result<Event>;

    /// Run a filtered query; results come back in store order.
    async fn find_events(&self, query: &EventQuery) -> Result<Vec<Event>>;

    /// Stream matching event ids through `sink`, one at a time, without
    /// materializing the whole result set.
    async fn stream_event_ids(&self, query: &TimeQuery, sink: &mut dyn EventIdSink)
        -> Result<()>;

    async fn create_topic(&self, topic: NewTopic) -> Result<String>;

    /// Replace the topic registered under `old_name` with `topic` — a
    /// rename-and-redefine, not a partial patch.
    async fn rename_topic(&self, old_name: &str, topic: NewTopic) -> Result<String>;

    async fn delete_topic(&self, name: &str) -> Result<()>;

    async fn list_topics(&self) -> Result<Vec<Topic>>;

    async fn create_dc(&self, name: &str) -> Result<String>;

    async fn update_dc(&self, old_name: &str, new_name: &str) -> Result<String>;

    async fn list_dcs(&self) -> Result<Vec<Dc>>;

    /// Resolve a datacenter id to its display name. Unknown ids resolve
    /// to an empty string; resolution is a pure lookup, never a failure.
    async fn dc_name(&self, id: &str) -> String;

    /// Resolve a topic id to its display name. Same contract as `dc_name`.
    async fn topic_name(&self, id: &str) -> String;
}
