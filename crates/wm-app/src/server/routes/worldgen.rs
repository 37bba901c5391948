use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};

use crate::server::schemas::{InitResponse, SceneResponse, TextRequest, read_form, rejected_body};
use crate::server::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/worldgen/init", post(init))
        .route("/api/worldgen/text2scene", post(text_to_scene))
        .route("/api/worldgen/image2scene", post(image_to_scene))
}

async fn init(State(state): State<Arc<AppState>>) -> Response {
    let result = state.studio.initialize_worldgen().await;
    InitResponse::reply(result, state.show_errors())
}

async fn text_to_scene(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    let result = match body {
        Ok(Json(body)) => state.studio.text_to_scene(body.into()).await,
        Err(rejection) => Err(rejected_body(rejection)),
    };
    SceneResponse::reply(result, state.show_errors())
}

async fn image_to_scene(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let result = match read_form(multipart).await {
        Ok(request) => state.studio.image_to_scene(request).await,
        Err(e) => Err(e),
    };
    SceneResponse::reply(result, state.show_errors())
}
