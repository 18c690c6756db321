//! Calendar link and event endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use anycal_core::LocalEvent;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/links", get(list_links))
        .route("/links/{id}/events", get(list_events))
        .route("/links/{id}/events", post(create_event))
}

/// Link info returned by the API. Credentials never appear here.
#[derive(Serialize)]
pub struct LinkInfo {
    pub id: String,
    pub provider: String,
    pub calendar_id: String,
    pub pull_enabled: bool,
    pub push_enabled: bool,
}

/// GET /links - List all configured calendar links
async fn list_links(State(state): State<AppState>) -> Json<Vec<LinkInfo>> {
    let links: Vec<LinkInfo> = state
        .engine()
        .links()
        .into_iter()
        .map(|link| LinkInfo {
            id: link.id,
            provider: link.provider.to_string(),
            calendar_id: link.calendar_id,
            pull_enabled: link.pull_enabled,
            push_enabled: link.push_enabled,
        })
        .collect();

    Json(links)
}

/// GET /links/:id/events - List local events for a link
async fn list_events(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Result<Json<Vec<LocalEvent>>, AppError> {
    state
        .engine()
        .link(&link_id)
        .ok_or_else(|| anyhow::anyhow!("Calendar link not found: {}", link_id))?;

    Ok(Json(state.engine().store().events_for_link(&link_id)))
}

/// Request body for creating a local event
#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
}

/// POST /links/:id/events - Create a local event, to be propagated on the
/// next push
async fn create_event(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(request): Json<CreateEventRequest>,
) -> Result<Json<LocalEvent>, AppError> {
    state
        .engine()
        .link(&link_id)
        .ok_or_else(|| anyhow::anyhow!("Calendar link not found: {}", link_id))?;

    let mut event = LocalEvent::new(&link_id, request.title, request.start, request.end);
    event.description = request.description;

    state.engine().store().insert(event.clone());
    Ok(Json(event))
}
