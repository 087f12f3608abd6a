//! Intake webhook — the HTTP surface the form service posts submissions to.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tracing::error;

use super::{FormSubmission, IntakePipeline};

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub pipeline: Arc<IntakePipeline>,
}

/// POST /api/intake
///
/// Accepts one submitted form response and runs the intake pipeline.
/// Returns the disposition (announced or sent for review).
async fn submit(
    State(state): State<IntakeRouteState>,
    Json(submission): Json<FormSubmission>,
) -> impl IntoResponse {
    match state.pipeline.process(submission).await {
        Ok(disposition) => (StatusCode::OK, Json(serde_json::json!(disposition))),
        Err(e) => {
            error!(error = %e, "Intake processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

/// Build the intake routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/api/intake", post(submit))
        .with_state(state)
}
