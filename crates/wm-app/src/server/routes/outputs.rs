use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::RequestRecord;
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    record: RequestRecord,
    icon: &'static str,
    elapsed_secs: i64,
}

impl From<RequestRecord> for RequestView {
    fn from(record: RequestRecord) -> Self {
        Self {
            icon: record.status.icon(),
            elapsed_secs: record.elapsed_secs(),
            record,
        }
    }
}

/// Recent requests, newest first
pub async fn list_requests(State(state): State<Arc<AppState>>) -> Json<Vec<RequestView>> {
    let views = state
        .studio
        .requests()
        .list()
        .into_iter()
        .map(RequestView::from)
        .collect();
    Json(views)
}

pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.studio.requests().get(id) {
        Some(record) => Json(RequestView::from(record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No request {}", id) })),
        )
            .into_response(),
    }
}

pub async fn release_output(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.studio.outputs().release(&name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            let code = match e.downcast_ref::<AppError>() {
                Some(AppError::UnknownOutput(_)) => StatusCode::NOT_FOUND,
                _ => {
                    error!("Failed to release {}: {:#}", name, e);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (code, Json(json!({ "error": format!("{:#}", e) }))).into_response()
        }
    }
}
