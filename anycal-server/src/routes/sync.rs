//! Sync endpoints
//!
//! Sync outcomes are reported in the response body, not the status code: a
//! failed pass still answers 200 with `success: false` and per-phase stats.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

use anycal_core::SyncResult;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/links/{id}/sync", post(sync_link))
        .route("/links/{id}/pull", post(pull_link))
        .route("/links/{id}/push", post(push_link))
}

/// POST /links/:id/sync - Pull then push
async fn sync_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Json<SyncResult> {
    let engine = state.engine_handle();
    run_detached(async move { engine.sync(&link_id).await }).await
}

/// POST /links/:id/pull - Pull only
async fn pull_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Json<SyncResult> {
    let engine = state.engine_handle();
    run_detached(async move { engine.pull(&link_id).await }).await
}

/// POST /links/:id/push - Push only
async fn push_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> Json<SyncResult> {
    let engine = state.engine_handle();
    run_detached(async move { engine.push(&link_id).await }).await
}

/// Run the sync on a spawned task so a client disconnect cannot cancel an
/// in-flight pass and leave the stores half-applied.
async fn run_detached(
    work: impl Future<Output = SyncResult> + Send + 'static,
) -> Json<SyncResult> {
    Json(
        tokio::spawn(work)
            .await
            .unwrap_or_else(|e| SyncResult::failure(format!("Sync task failed: {e}"))),
    )
}
