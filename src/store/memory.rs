//! In-memory `EventStore` implementation.
//!
//! Backs local deployments and the gateway's own tests. Failure injection
//! (`set_fail_backend`) lets tests exercise the store-error paths without
//! a real backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventIdSink, EventStore, Result, StoreError};
use crate::domain::{
    Dc, Event, EventQuery, NewTopic, TimeQuery, Topic, UnaddedEvent, TIME_UNBOUNDED,
};

/// In-memory event store guarded by RwLocks.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
    topics: RwLock<HashMap<String, Topic>>,
    dcs: RwLock<HashMap<String, Dc>>,
    fail_backend: RwLock<bool>,
    /// Count of create_event calls, observable from tests.
    creates: RwLock<u64>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a backend error.
    pub async fn set_fail_backend(&self, fail: bool) {
        *self.fail_backend.write().await = fail;
    }

    /// Number of create_event invocations so far.
    pub async fn create_count(&self) -> u64 {
        *self.creates.read().await
    }

    async fn check_backend(&self) -> Result<()> {
        if *self.fail_backend.read().await {
            return Err(StoreError::Backend("injected backend failure".to_string()));
        }
        Ok(())
    }

    async fn topic_id_by_name(&self, name: &str) -> Option<String> {
        let topics = self.topics.read().await;
        topics
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id.clone())
    }

    async fn dc_id_by_name(&self, name: &str) -> Option<String> {
        let dcs = self.dcs.read().await;
        dcs.values().find(|d| d.name == name).map(|d| d.id.clone())
    }
}

fn in_time_range(time: i64, start: i64, end: i64) -> bool {
    (start == TIME_UNBOUNDED || time >= start) && (end == TIME_UNBOUNDED || time <= end)
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create_event(&self, event: UnaddedEvent) -> Result<String> {
        self.check_backend().await?;
        *self.creates.write().await += 1;

        let topic_id = self
            .topic_id_by_name(&event.topic_name)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("topic {}", event.topic_name)))?;
        let dc_id = self
            .dc_id_by_name(&event.dc)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("dc {}", event.dc)))?;

        let id = Uuid::new_v4().to_string();
        let stored = Event {
            event_id: id.clone(),
            parent_event_id: event.parent_event_id,
            event_time: event.event_time,
            dc_id,
            topic_id,
            tags: event.tags,
            host: event.host,
            target_hosts: event.target_hosts,
            user: event.user,
            data: event.data,
        };
        self.events.write().await.insert(id.clone(), stored);
        Ok(id)
    }

    async fn find_event_by_id(&self, id: &str) -> Result<Event> {
        self.check_backend().await?;
        let events = self.events.read().await;
        events
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("event {}", id)))
    }

    async fn find_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        self.check_backend().await?;

        let topic_id = if query.topic_name.is_empty() {
            None
        } else {
            self.topic_id_by_name(&query.topic_name).await
        };
        let dc_id = if query.dc.is_empty() {
            None
        } else {
            self.dc_id_by_name(&query.dc).await
        };

        let events = self.events.read().await;
        let mut matched: Vec<Event> = events
            .values()
            .filter(|e| in_time_range(e.event_time, query.time_start, query.time_end))
            .filter(|e| query.host.is_empty() || e.host == query.host)
            .filter(|e| query.user.is_empty() || e.user == query.user)
            .filter(|e| {
                query.parent_event_id.is_empty()
                    || e.parent_event_id.as_deref() == Some(query.parent_event_id.as_str())
            })
            .filter(|e| match (&query.topic_name, &topic_id) {
                (name, _) if name.is_empty() => true,
                (_, Some(id)) => &e.topic_id == id,
                // Named a topic the store has never seen: nothing matches.
                (_, None) => false,
            })
            .filter(|e| match (&query.dc, &dc_id) {
                (name, _) if name.is_empty() => true,
                (_, Some(id)) => &e.dc_id == id,
                (_, None) => false,
            })
            .filter(|e| query.tag_set.iter().all(|t| e.tags.contains(t)))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.event_time);
        Ok(matched)
    }

    async fn stream_event_ids(
        &self,
        query: &TimeQuery,
        sink: &mut dyn EventIdSink,
    ) -> Result<()> {
        self.check_backend().await?;

        let mut matched: Vec<(i64, String)> = {
            let events = self.events.read().await;
            events
                .values()
                .filter(|e| in_time_range(e.event_time, query.time_start, query.time_end))
                .map(|e| (e.event_time, e.event_id.clone()))
                .collect()
        };
        matched.sort_by_key(|(time, _)| *time);
        if !query.ascending {
            matched.reverse();
        }
        if query.limit > 0 {
            matched.truncate(query.limit as usize);
        }

        // Lock released above; emit may block on the caller's channel.
        for (_, id) in matched {
            sink.emit(&id).await?;
        }
        Ok(())
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<String> {
        self.check_backend().await?;
        if self.topic_id_by_name(&topic.name).await.is_some() {
            return Err(StoreError::Backend(format!(
                "topic {} already exists",
                topic.name
            )));
        }
        let id = Uuid::new_v4().to_string();
        self.topics.write().await.insert(
            id.clone(),
            Topic {
                id: id.clone(),
                name: topic.name,
                schema: topic.schema,
            },
        );
        Ok(id)
    }

    async fn rename_topic(&self, old_name: &str, topic: NewTopic) -> Result<String> {
        self.check_backend().await?;
        let id = self
            .topic_id_by_name(old_name)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("topic {}", old_name)))?;
        // Renaming to the current name is a no-op, not a collision.
        if topic.name != old_name && self.topic_id_by_name(&topic.name).await.is_some() {
            return Err(StoreError::Backend(format!(
                "topic {} already exists",
                topic.name
            )));
        }
        self.topics.write().await.insert(
            id.clone(),
            Topic {
                id: id.clone(),
                name: topic.name,
                schema: topic.schema,
            },
        );
        Ok(id)
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        self.check_backend().await?;
        let id = self
            .topic_id_by_name(name)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("topic {}", name)))?;
        self.topics.write().await.remove(&id);
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.check_backend().await?;
        let topics = self.topics.read().await;
        let mut all: Vec<Topic> = topics.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn create_dc(&self, name: &str) -> Result<String> {
        self.check_backend().await?;
        if self.dc_id_by_name(name).await.is_some() {
            return Err(StoreError::Backend(format!("dc {} already exists", name)));
        }
        let id = Uuid::new_v4().to_string();
        self.dcs.write().await.insert(
            id.clone(),
            Dc {
                id: id.clone(),
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    async fn update_dc(&self, old_name: &str, new_name: &str) -> Result<String> {
        self.check_backend().await?;
        let id = self
            .dc_id_by_name(old_name)
            .await
            .ok_or_else(|| StoreError::NotFound(format!("dc {}", old_name)))?;
        if new_name != old_name && self.dc_id_by_name(new_name).await.is_some() {
            return Err(StoreError::Backend(format!("dc {} already exists", new_name)));
        }
        self.dcs.write().await.insert(
            id.clone(),
            Dc {
                id: id.clone(),
                name: new_name.to_string(),
            },
        );
        Ok(id)
    }

    async fn list_dcs(&self) -> Result<Vec<Dc>> {
        self.check_backend().await?;
        let dcs = self.dcs.read().await;
        let mut all: Vec<Dc> = dcs.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn dc_name(&self, id: &str) -> String {
        let dcs = self.dcs.read().await;
        dcs.get(id).map(|d| d.name.clone()).unwrap_or_default()
    }

    async fn topic_name(&self, id: &str) -> String {
        let topics = self.topics.read().await;
        topics.get(id).map(|t| t.name.clone()).unwrap_or_default()
    }
}
