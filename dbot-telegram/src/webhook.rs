//! Webhook adapter: an axum route that decodes pushed updates and enqueues them.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use dbot_core::Update;
use serde::Serialize;
use tracing::{debug, warn};

use crate::queue::UpdateSender;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Router with `POST {path}` accepting one JSON-encoded update per request.
///
/// Responds 200 with an empty body once enqueued, 400 `{"error": ...}` when the body does not
/// decode, 503 `{"error": ...}` when the queue is closed. Waits while the queue is full.
pub fn build_router(path: &str, sender: UpdateSender) -> Router {
    Router::new()
        .route(path, post(receive_update))
        .with_state(sender)
}

async fn receive_update(State(sender): State<UpdateSender>, body: Bytes) -> Response {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Webhook body is not a valid update");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let update_id = update.update_id;
    match sender.send(update).await {
        Ok(()) => {
            debug!(update_id, "step: webhook update enqueued");
            StatusCode::OK.into_response()
        }
        Err(e) => {
            warn!(update_id, error = %e, "Webhook update refused");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}
