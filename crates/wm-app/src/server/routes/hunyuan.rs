use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};

use crate::server::schemas::{InitResponse, TextRequest, WorldResponse, read_form, rejected_body};
use crate::server::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/hunyuan/init", post(init))
        .route("/api/hunyuan/text2world", post(text_to_world))
        .route("/api/hunyuan/image2world", post(image_to_world))
}

async fn init(State(state): State<Arc<AppState>>) -> Response {
    let result = state.studio.initialize_hunyuan().await;
    InitResponse::reply(result, state.show_errors())
}

async fn text_to_world(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(body)) => state.studio.text_to_world(body.into()).await,
        Err(rejection) => Err(rejected_body(rejection)),
    };
    WorldResponse::reply(result, state.show_errors())
}

async fn image_to_world(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let result = match read_form(multipart).await {
        Ok(request) => state.studio.image_to_world(request).await,
        Err(e) => Err(e),
    };
    WorldResponse::reply(result, state.show_errors())
}
