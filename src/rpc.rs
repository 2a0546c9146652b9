//! gRPC front end.
//!
//! Decodes typed request messages into the canonical domain model,
//! dispatches to the store, and encodes typed responses. GetEvents and
//! GetEventIds are server-streaming; GetEventIds hands the streaming loop
//! to the store through an [`EventIdSink`] so very large result sets are
//! never materialized gateway-side.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::error;

use crate::domain::{self, EventQuery, NewTopic, TimeQuery, UnaddedEvent};
use crate::error::GatewayError;
use crate::instrument::perform_operation;
use crate::metrics;
use crate::proto::event_gateway_server::EventGateway;
use crate::proto::{
    Dc, DcResult, DeleteTopicRequest, EmptyRequest, Event, EventId, HealthcheckRequest,
    HealthcheckResponse, Query, TimeQuery as TimeQueryMessage, Topic, TopicResult,
    UpdateDcRequest, UpdateTopicRequest, WriteResponse,
};
use crate::store::{EventIdSink, EventStore, StoreError};

/// gRPC service over the event store.
pub struct EventGatewayService {
    store: Arc<dyn EventStore>,
}

impl EventGatewayService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Resolve ids to display names and re-encode the data document for
    /// one outbound event message.
    async fn encode_event(
        store: &dyn EventStore,
        ev: domain::Event,
    ) -> Result<Event, GatewayError> {
        let data = serde_json::to_vec(&ev.data)
            .map_err(|e| GatewayError::Encode(format!("data json encode: {}", e)))?;
        Ok(Event {
            event_id: ev.event_id,
            parent_event_id: ev.parent_event_id.unwrap_or_default(),
            event_time: ev.event_time,
            dc: store.dc_name(&ev.dc_id).await,
            topic_name: store.topic_name(&ev.topic_id).await,
            tag_set: ev.tags,
            host: ev.host,
            target_host_set: ev.target_hosts,
            user: ev.user,
            data,
        })
    }
}

fn query_from_proto(q: Query) -> EventQuery {
    EventQuery {
        dc: q.dc,
        host: q.host,
        topic_name: q.topic_name,
        user: q.user,
        tag_set: q.tag_set,
        parent_event_id: q.parent_event_id,
        time_start: q.time_start,
        time_end: q.time_end,
    }
}

fn time_query_from_proto(q: TimeQueryMessage) -> TimeQuery {
    TimeQuery {
        time_start: q.time_start,
        time_end: q.time_end,
        ascending: q.ascending,
        limit: q.limit,
    }
}

/// Channel-backed sink handed to the store for GetEventIds. The store's
/// own loop drives it; a closed channel means the client went away.
struct ChannelIdSink {
    tx: mpsc::Sender<Result<EventId, Status>>,
}

#[async_trait]
impl EventIdSink for ChannelIdSink {
    async fn emit(&mut self, event_id: &str) -> Result<(), StoreError> {
        self.tx
            .send(Ok(EventId {
                event_id: event_id.to_string(),
            }))
            .await
            .map_err(|_| StoreError::Backend("stream send: client disconnected".to_string()))
    }
}

/// Drives one GetEvents response stream: encodes each row and sends it
/// downstream. The first encode failure becomes the final item, with
/// nothing sent after it; a dropped receiver stops the loop outright.
/// Either way the operation records exactly one failure outcome.
async fn pump_events<F, Fut>(
    name: &'static str,
    start: Instant,
    events: Vec<domain::Event>,
    tx: mpsc::Sender<Result<Event, Status>>,
    mut encode: F,
) where
    F: FnMut(domain::Event) -> Fut,
    Fut: std::future::Future<Output = Result<Event, GatewayError>>,
{
    for ev in events {
        match encode(ev).await {
            Ok(event) => {
                if tx.send(Ok(event)).await.is_err() {
                    // Client disconnected mid-stream.
                    metrics::record_duration(name, start.elapsed());
                    metrics::record_outcome(name, false);
                    return;
                }
            }
            Err(err) => {
                // Abort after whatever has already been sent.
                metrics::record_duration(name, start.elapsed());
                metrics::record_outcome(name, false);
                error!(operation = %name, error = %err, "event encode failed");
                let _ = tx.send(Err(err.in_operation(name))).await;
                return;
            }
        }
    }
    metrics::record_duration(name, start.elapsed());
    metrics::record_outcome(name, true);
}

#[tonic::async_trait]
impl EventGateway for EventGatewayService {
    type GetEventsStream = ReceiverStream<Result<Event, Status>>;
    type GetEventIdsStream = ReceiverStream<Result<EventId, Status>>;

    async fn add_event(
        &self,
        request: Request<Event>,
    ) -> Result<Response<WriteResponse>, Status> {
        let evt = request.into_inner();
        let store = self.store.clone();

        perform_operation("AddEvent", || async move {
            let data = domain::decode_json_object(&evt.data)
                .map_err(|e| GatewayError::Decode(format!("json decode of data: {}", e)))?;

            let id = store
                .create_event(UnaddedEvent {
                    parent_event_id: (!evt.parent_event_id.is_empty())
                        .then_some(evt.parent_event_id),
                    event_time: evt.event_time,
                    dc: evt.dc,
                    topic_name: evt.topic_name,
                    tags: evt.tag_set,
                    host: evt.host,
                    target_hosts: evt.target_host_set,
                    user: evt.user,
                    data,
                })
                .await?;
            Ok(id)
        })
        .await
    }

    async fn get_event_by_id(
        &self,
        request: Request<EventId>,
    ) -> Result<Response<Event>, Status> {
        let name = "GetEventByID";
        let start = Instant::now();
        let id = request.into_inner().event_id;

        let result: Result<Event, GatewayError> = async {
            let ev = self.store.find_event_by_id(&id).await?;
            Self::encode_event(self.store.as_ref(), ev).await
        }
        .await;

        metrics::record_duration(name, start.elapsed());
        match result {
            Ok(event) => {
                metrics::record_outcome(name, true);
                Ok(Response::new(event))
            }
            Err(err) => {
                metrics::record_outcome(name, false);
                error!(operation = %name, event_id = %id, error = %err, "lookup failed");
                Err(err.in_operation(name))
            }
        }
    }

    async fn get_events(
        &self,
        request: Request<Query>,
    ) -> Result<Response<Self::GetEventsStream>, Status> {
        let name = "GetEvents";
        let start = Instant::now();
        let query = query_from_proto(request.into_inner());

        // One blocking store query; results stream out in store order.
        let events = match self.store.find_events(&query).await {
            Ok(events) => events,
            Err(e) => {
                metrics::record_duration(name, start.elapsed());
                metrics::record_outcome(name, false);
                error!(operation = %name, error = %e, "event store find failed");
                return Err(GatewayError::from(e).in_operation(name));
            }
        };

        let store = self.store.clone();
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            pump_events(name, start, events, tx, move |ev| {
                let store = store.clone();
                async move { EventGatewayService::encode_event(store.as_ref(), ev).await }
            })
            .await;
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn get_event_ids(
        &self,
        request: Request<TimeQueryMessage>,
    ) -> Result<Response<Self::GetEventIdsStream>, Status> {
        let name = "GetEventIDs";
        let start = Instant::now();
        let query = time_query_from_proto(request.into_inner());

        let store = self.store.clone();
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut sink = ChannelIdSink { tx: tx.clone() };
            let result = store.stream_event_ids(&query, &mut sink).await;
            metrics::record_duration(name, start.elapsed());
            match result {
                Ok(()) => metrics::record_outcome(name, true),
                Err(e) => {
                    metrics::record_outcome(name, false);
                    error!(operation = %name, error = %e, "id stream failed");
                    // mpsc preserves order: every emitted id lands before
                    // this trailing error.
                    let _ = tx.send(Err(GatewayError::from(e).in_operation(name))).await;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn add_topic(
        &self,
        request: Request<Topic>,
    ) -> Result<Response<WriteResponse>, Status> {
        let t = request.into_inner();
        let store = self.store.clone();

        perform_operation("AddTopic", || async move {
            let schema = domain::decode_json_object(&t.data_schema)
                .map_err(|e| GatewayError::Decode(format!("json decode of schema: {}", e)))?;
            let id = store
                .create_topic(NewTopic {
                    name: t.topic_name,
                    schema,
                })
                .await?;
            Ok(id)
        })
        .await
    }

    async fn update_topic(
        &self,
        request: Request<UpdateTopicRequest>,
    ) -> Result<Response<WriteResponse>, Status> {
        let t = request.into_inner();
        let store = self.store.clone();

        // Rename-and-redefine: old name is the lookup key, the new
        // name+schema replace the definition wholesale.
        perform_operation("UpdateTopic", || async move {
            let schema = domain::decode_json_object(&t.data_schema)
                .map_err(|e| GatewayError::Decode(format!("json decode of schema: {}", e)))?;
            let id = store
                .rename_topic(
                    &t.old_name,
                    NewTopic {
                        name: t.new_name,
                        schema,
                    },
                )
                .await?;
            Ok(id)
        })
        .await
    }

    async fn delete_topic(
        &self,
        request: Request<DeleteTopicRequest>,
    ) -> Result<Response<WriteResponse>, Status> {
        let t = request.into_inner();
        let store = self.store.clone();

        // Delete yields no id; the acknowledgment carries an empty one.
        perform_operation("DeleteTopic", || async move {
            store.delete_topic(&t.topic_name).await?;
            Ok(String::new())
        })
        .await
    }

    async fn get_topics(
        &self,
        _request: Request<EmptyRequest>,
    ) -> Result<Response<TopicResult>, Status> {
        let name = "GetTopics";
        let start = Instant::now();

        let result: Result<TopicResult, GatewayError> = async {
            let topics = self.store.list_topics().await?;
            let mut results = Vec::with_capacity(topics.len());
            for topic in topics {
                let data_schema = serde_json::to_vec(&topic.schema)
                    .map_err(|e| GatewayError::Encode(format!("schema json encode: {}", e)))?;
                results.push(Topic {
                    id: topic.id,
                    topic_name: topic.name,
                    data_schema,
                });
            }
            Ok(TopicResult { results })
        }
        .await;

        metrics::record_duration(name, start.elapsed());
        match result {
            Ok(topics) => {
                metrics::record_outcome(name, true);
                Ok(Response::new(topics))
            }
            Err(err) => {
                metrics::record_outcome(name, false);
                error!(operation = %name, error = %err, "get topics failed");
                Err(err.in_operation(name))
            }
        }
    }

    async fn add_dc(&self, request: Request<Dc>) -> Result<Response<WriteResponse>, Status> {
        let d = request.into_inner();
        let store = self.store.clone();

        perform_operation("AddDC", || async move {
            let id = store.create_dc(&d.dc_name).await?;
            Ok(id)
        })
        .await
    }

    async fn update_dc(
        &self,
        request: Request<UpdateDcRequest>,
    ) -> Result<Response<WriteResponse>, Status> {
        let d = request.into_inner();
        let store = self.store.clone();

        perform_operation("UpdateDC", || async move {
            let id = store.update_dc(&d.old_name, &d.new_name).await?;
            Ok(id)
        })
        .await
    }

    async fn get_dcs(
        &self,
        _request: Request<EmptyRequest>,
    ) -> Result<Response<DcResult>, Status> {
        let name = "GetDCs";
        let start = Instant::now();

        let result = self.store.list_dcs().await;

        metrics::record_duration(name, start.elapsed());
        match result {
            Ok(dcs) => {
                metrics::record_outcome(name, true);
                let results = dcs
                    .into_iter()
                    .map(|dc| Dc {
                        id: dc.id,
                        dc_name: dc.name,
                    })
                    .collect();
                Ok(Response::new(DcResult { results }))
            }
            Err(e) => {
                metrics::record_outcome(name, false);
                error!(operation = %name, error = %e, "get dcs failed");
                Err(GatewayError::from(e).in_operation(name))
            }
        }
    }

    async fn healthcheck(
        &self,
        _request: Request<HealthcheckRequest>,
    ) -> Result<Response<HealthcheckResponse>, Status> {
        // Liveness only; deliberately no store interaction.
        let start = Instant::now();
        let response = HealthcheckResponse {
            response: "OK".to_string(),
        };
        metrics::record_duration("Healthcheck", start.elapsed());
        metrics::record_outcome("Healthcheck", true);
        Ok(Response::new(response))
    }
}
