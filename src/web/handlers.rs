//! Browser form handlers.
//!
//! Four page-level handlers over the same store the RPC front end uses.
//! Form field shapes live here and translate into the canonical domain
//! types; errors render as plain-text bodies.

use std::time::Instant;

use axum::extract::{Query as UrlQuery, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{error, info};

use super::pages::{self, DisplayEvent};
use super::AppState;
use crate::domain::{self, EventQuery, UnaddedEvent, TIME_UNBOUNDED};
use crate::error::GatewayError;
use crate::metrics;

/// Query-page form fields. Browsers always submit every field; missing
/// ones default to empty rather than failing the request.
#[derive(Debug, Deserialize, Default)]
pub struct QueryForm {
    #[serde(default)]
    pub dc: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default, rename = "startDate")]
    pub start_date: String,
    #[serde(default, rename = "endDate")]
    pub end_date: String,
}

/// Create-page form fields.
#[derive(Debug, Deserialize, Default)]
pub struct CreateForm {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub dc: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

/// Parse an optional calendar date into a time bound. Empty string means
/// unbounded; a malformed date fails before any store call.
fn parse_time_bound(value: &str) -> Result<i64, GatewayError> {
    if value.is_empty() {
        return Ok(TIME_UNBOUNDED);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| GatewayError::Validation(format!("invalid date {}: {}", value, e)))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

fn build_query(form: &QueryForm) -> Result<EventQuery, GatewayError> {
    Ok(EventQuery {
        dc: form.dc.clone(),
        host: form.host.clone(),
        topic_name: form.topic.clone(),
        time_start: parse_time_bound(&form.start_date)?,
        time_end: parse_time_bound(&form.end_date)?,
        ..Default::default()
    })
}

/// Run a query and render the shared listing page.
async fn render_listing(state: &AppState, query: &EventQuery) -> Result<Html<String>, GatewayError> {
    let events = state.store.find_events(query).await?;

    let mut display = Vec::with_capacity(events.len());
    for ev in events {
        let data = serde_json::to_string(&ev.data)
            .map_err(|e| GatewayError::Encode(format!("data json encode: {}", e)))?;
        display.push(DisplayEvent {
            dc: state.store.dc_name(&ev.dc_id).await,
            topic: state.store.topic_name(&ev.topic_id).await,
            event_id: ev.event_id,
            event_time: ev.event_time,
            tags: ev.tags,
            host: ev.host,
            user: ev.user,
            data,
        });
    }

    let topics: Vec<String> = state
        .store
        .list_topics()
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    let dcs: Vec<String> = state
        .store
        .list_dcs()
        .await?
        .into_iter()
        .map(|d| d.name)
        .collect();

    Ok(pages::listing(&display, &topics, &dcs))
}

/// GET / — the full event set, no filter or pagination.
pub async fn main_page(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let name = "MainPage";
    let start = Instant::now();

    let result = render_listing(&state, &EventQuery::default()).await;

    metrics::record_duration(name, start.elapsed());
    match result {
        Ok(page) => {
            metrics::record_outcome(name, true);
            Ok(page.into_response())
        }
        Err(err) => {
            metrics::record_outcome(name, false);
            error!(operation = %name, error = %err, "main page failed");
            Err(err)
        }
    }
}

/// GET /event — query form submission.
pub async fn query_page(
    State(state): State<AppState>,
    UrlQuery(form): UrlQuery<QueryForm>,
) -> Result<Response, GatewayError> {
    let name = "QueryPage";
    let start = Instant::now();

    let result = async {
        let query = build_query(&form)?;
        render_listing(&state, &query).await
    }
    .await;

    metrics::record_duration(name, start.elapsed());
    match result {
        Ok(page) => {
            metrics::record_outcome(name, true);
            Ok(page.into_response())
        }
        Err(err) => {
            metrics::record_outcome(name, false);
            error!(operation = %name, error = %err, "query page failed");
            Err(err)
        }
    }
}

/// GET /create_form — empty creation form with current topic/DC lists.
pub async fn create_page(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let name = "CreatePage";
    let start = Instant::now();

    let result: Result<Html<String>, GatewayError> = async {
        let topics: Vec<String> = state
            .store
            .list_topics()
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();
        let dcs: Vec<String> = state
            .store
            .list_dcs()
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect();
        Ok(pages::create_form(&topics, &dcs))
    }
    .await;

    metrics::record_duration(name, start.elapsed());
    match result {
        Ok(page) => {
            metrics::record_outcome(name, true);
            Ok(page.into_response())
        }
        Err(err) => {
            metrics::record_outcome(name, false);
            error!(operation = %name, error = %err, "create page failed");
            Err(err)
        }
    }
}

/// Translate the create form into an `UnaddedEvent`. All validation runs
/// before any store call.
fn event_from_form(form: &CreateForm) -> Result<UnaddedEvent, GatewayError> {
    if form.date.is_empty() {
        return Err(GatewayError::Validation("date cannot be empty".to_string()));
    }
    if form.time.is_empty() {
        return Err(GatewayError::Validation("time cannot be empty".to_string()));
    }

    let full_time = format!("{} {}", form.date, form.time);
    let timestamp = NaiveDateTime::parse_from_str(&full_time, "%Y-%m-%d %H:%M")
        .map_err(|e| GatewayError::Validation(format!("invalid date entered: {}", e)))?
        .and_utc()
        .timestamp();

    let data = domain::decode_json_object(form.data.as_bytes())
        .map_err(|e| GatewayError::Decode(format!("json decode of data: {}", e)))?;

    Ok(UnaddedEvent {
        event_time: timestamp,
        dc: form.dc.clone(),
        topic_name: form.topic.clone(),
        tags: domain::split_tags(&form.tags),
        host: form.host.clone(),
        user: form.user.clone(),
        data,
        ..Default::default()
    })
}

/// POST /add_event — fire-and-forget write; the browser gets a redirect
/// back to the main page, not a structured acknowledgment.
pub async fn create_event(
    State(state): State<AppState>,
    axum::Form(form): axum::Form<CreateForm>,
) -> Result<Response, GatewayError> {
    let name = "CreateEvent";
    let start = Instant::now();

    let result = async {
        let event = event_from_form(&form)?;
        let id = state.store.create_event(event).await?;
        Ok::<String, GatewayError>(id)
    }
    .await;

    metrics::record_duration(name, start.elapsed());
    match result {
        Ok(id) => {
            metrics::record_outcome(name, true);
            info!(operation = %name, event_id = %id, "event created from form");
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            metrics::record_outcome(name, false);
            error!(operation = %name, error = %err, "create event failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTopic;
    use crate::store::{EventStore, MemoryEventStore};
    use axum::http::StatusCode;
    use std::sync::Arc;

    async fn seeded_state() -> (AppState, Arc<MemoryEventStore>) {
        let store = Arc::new(MemoryEventStore::new());
        store
            .create_topic(NewTopic {
                name: "deploys".to_string(),
                schema: Default::default(),
            })
            .await
            .unwrap();
        store.create_dc("us-east-1").await.unwrap();
        (AppState { store: store.clone() }, store)
    }

    fn create_form_fields() -> CreateForm {
        CreateForm {
            topic: "deploys".to_string(),
            dc: "us-east-1".to_string(),
            tags: "a,b,c".to_string(),
            host: "web-1".to_string(),
            user: "deployer".to_string(),
            data: r#"{"build": 4}"#.to_string(),
            date: "2023-01-01".to_string(),
            time: "12:30".to_string(),
        }
    }

    #[test]
    fn test_parse_time_bound_empty_is_unbounded() {
        assert_eq!(parse_time_bound("").unwrap(), TIME_UNBOUNDED);
    }

    #[test]
    fn test_parse_time_bound_midnight_utc() {
        // 2023-01-01T00:00:00Z
        assert_eq!(parse_time_bound("2023-01-01").unwrap(), 1672531200);
    }

    #[test]
    fn test_parse_time_bound_rejects_garbage() {
        let err = parse_time_bound("01/01/2023").unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn test_build_query_defaults() {
        let query = build_query(&QueryForm::default()).unwrap();
        assert_eq!(query.time_start, TIME_UNBOUNDED);
        assert_eq!(query.time_end, TIME_UNBOUNDED);
        assert!(query.dc.is_empty());
    }

    #[test]
    fn test_event_from_form_combines_date_and_time() {
        let event = event_from_form(&create_form_fields()).unwrap();
        // 2023-01-01T12:30:00Z
        assert_eq!(event.event_time, 1672576200);
        assert_eq!(event.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_event_from_form_empty_tags() {
        let mut form = create_form_fields();
        form.tags = String::new();
        let event = event_from_form(&form).unwrap();
        assert!(event.tags.is_empty());
    }

    #[test]
    fn test_event_from_form_requires_date_and_time() {
        let mut form = create_form_fields();
        form.date = String::new();
        assert!(matches!(
            event_from_form(&form).unwrap_err(),
            GatewayError::Validation(_)
        ));

        let mut form = create_form_fields();
        form.time = String::new();
        assert!(matches!(
            event_from_form(&form).unwrap_err(),
            GatewayError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_create_event_redirects_on_success() {
        let (state, store) = seeded_state().await;

        let response = create_event(State(state), axum::Form(create_form_fields()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");
        assert_eq!(store.create_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_event_empty_date_never_reaches_store() {
        let (state, store) = seeded_state().await;
        let mut form = create_form_fields();
        form.date = String::new();

        let err = create_event(State(state), axum::Form(form)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.create_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_event_malformed_data() {
        let (state, store) = seeded_state().await;
        let mut form = create_form_fields();
        form.data = "{broken".to_string();

        let err = create_event(State(state), axum::Form(form)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
        assert_eq!(store.create_count().await, 0);
    }

    #[tokio::test]
    async fn test_query_page_rejects_malformed_date_before_store() {
        let (state, _) = seeded_state().await;
        let form = QueryForm {
            start_date: "not-a-date".to_string(),
            ..Default::default()
        };

        let err = query_page(State(state), UrlQuery(form)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn test_main_page_renders_events() {
        let (state, store) = seeded_state().await;
        store
            .create_event(UnaddedEvent {
                event_time: 100,
                dc: "us-east-1".to_string(),
                topic_name: "deploys".to_string(),
                host: "web-1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let response = main_page(State(state)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
