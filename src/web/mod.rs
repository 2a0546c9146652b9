//! Browser-facing form front end.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::store::EventStore;

pub mod handlers;
pub mod pages;

/// Shared state for the form handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
}

/// The four form routes: list-all, filtered query, create form, create
/// submit.
pub fn router(store: Arc<dyn EventStore>) -> Router {
    Router::new()
        .route("/", get(handlers::main_page))
        .route("/event", get(handlers::query_page))
        .route("/create_form", get(handlers::create_page))
        .route("/add_event", post(handlers::create_event))
        .with_state(AppState { store })
}
