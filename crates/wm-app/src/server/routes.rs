use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{delete, get};

use crate::config::Profile;
use crate::server::state::AppState;

mod hunyuan;
mod models;
mod outputs;
mod worldgen;

/// Routes of a model family are only mounted when the profile serves it.
pub fn api_routes(profile: Profile) -> Router<Arc<AppState>> {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(models::health))
        .route("/api/models", get(models::list_models))
        .route("/api/requests", get(outputs::list_requests))
        .route("/api/requests/{id}", get(outputs::get_request))
        .route("/api/outputs/{name}", delete(outputs::release_output));

    if profile.has_hunyuan() {
        router = router.merge(hunyuan::routes());
    }
    if profile.has_worldgen() {
        router = router.merge(worldgen::routes());
    }
    router
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page().to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::server::router;
    use crate::testing::{Harness, harness, png_bytes};

    const BOUNDARY: &str = "worldsmith-boundary";

    fn app(h: &Harness) -> Router {
        router(Arc::new(AppState::new(h.studio.clone())))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, fields: &[(&str, &str)], image: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"input.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_index_renders_profile_page() {
        let h = harness(Profile::Worldgen).await;
        let (status, body) = send(&app(&h), Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);

        let page = String::from_utf8(body).unwrap();
        assert!(page.contains("WorldGen Studio"));
        assert!(!page.contains("/api/hunyuan/init"));
    }

    #[tokio::test]
    async fn test_routes_follow_profile() {
        let h = harness(Profile::Worldgen).await;
        let (status, _) = send(&app(&h), post_empty("/api/hunyuan/init")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let h = harness(Profile::Hunyuan).await;
        let (status, _) = send(&app(&h), post_empty("/api/worldgen/init")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generation_before_init_is_a_conflict() {
        let h = harness(Profile::Studio).await;
        let (status, body) = send_json(
            &app(&h),
            post_json("/api/worldgen/text2scene", json!({ "prompt": "a forest" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], "Please initialize WorldGen first!");
        assert_eq!(body["error"]["kind"], "not_initialized");
        assert!(body["artifact"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_json_gets_error_envelope() {
        let h = harness(Profile::Studio).await;
        let app = app(&h);
        send(&app, post_empty("/api/worldgen/init")).await;

        let (status, body) = send_json(
            &app,
            post_json(
                "/api/worldgen/text2scene",
                json!({ "prompt": "a forest", "class": "underwater" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid_input");
        assert!(body["status"].as_str().unwrap().contains("underwater"));

        let request = Request::post("/api/hunyuan/text2world")
            .body(Body::from("prompt=a+forest"))
            .unwrap();
        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid_input");
        assert!(body["panorama"].is_null());
    }

    #[tokio::test]
    async fn test_models_carry_model_information() {
        let h = harness(Profile::Worldgen).await;
        let (status, body) =
            send_json(&app(&h), Request::get("/api/models").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);

        let models = body["models"].as_array().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0]["output_format"], "PLY (Gaussian splat or mesh)");
        assert!(!models[0]["best_for"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_to_scene_serves_artifact() {
        let h = harness(Profile::Worldgen).await;
        let app = app(&h);

        let (status, body) = send_json(&app, post_empty("/api/worldgen/init")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "✅ WorldGen initialized successfully!");

        let (status, body) = send_json(
            &app,
            post_json(
                "/api/worldgen/text2scene",
                json!({ "prompt": "a forest", "return_mesh": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "✅ Generation successful!");
        assert_eq!(body["summary"]["faces"], 1);

        let url = body["artifact"]["url"].as_str().unwrap();
        assert!(url.ends_with("/scene_mesh.ply"));
        let (status, bytes) = send(&app, Request::get(url).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"ply"));

        let (_, body) = send_json(&app, Request::get("/api/models").body(Body::empty()).unwrap()).await;
        assert_eq!(body["world_mode"], "t2s");
    }

    #[tokio::test]
    async fn test_image_to_world_with_multipart_upload() {
        let h = harness(Profile::Hunyuan).await;
        let app = app(&h);
        send(&app, post_empty("/api/hunyuan/init")).await;

        let png = png_bytes();
        let (status, body) = send_json(
            &app,
            post_form(
                "/api/hunyuan/image2world",
                &[("labels_fg1", "stones flowers"), ("class", "indoor")],
                &png,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["panorama"]["url"].as_str().unwrap().ends_with("/panorama.png"));
        assert!(body["mesh"]["path"].as_str().unwrap().ends_with("scene_mesh.glb"));
        assert_eq!(h.loader.scene_calls()[0].labels_fg1, vec!["stones", "flowers"]);
    }

    #[tokio::test]
    async fn test_bad_upload_is_a_bad_request() {
        let h = harness(Profile::Worldgen).await;
        let app = app(&h);
        send(&app, post_empty("/api/worldgen/init")).await;

        let (status, body) = send_json(
            &app,
            post_form("/api/worldgen/image2scene", &[], b"definitely not a png"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["status"].as_str().unwrap().starts_with("⚠️"));

        let (status, _) = send_json(
            &app,
            post_form("/api/worldgen/image2scene", &[("class", "underwater")], &png_bytes()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_requests_listing_and_release() {
        let h = harness(Profile::Worldgen).await;
        let app = app(&h);
        send(&app, post_empty("/api/worldgen/init")).await;
        let (_, body) = send_json(
            &app,
            post_json("/api/worldgen/text2scene", json!({ "prompt": "a forest" })),
        )
        .await;
        let dir = body["output_dir"].as_str().unwrap().to_string();

        let (_, list) = send_json(&app, Request::get("/api/requests").body(Body::empty()).unwrap()).await;
        assert_eq!(list[0]["status"], "SUCCEEDED");
        assert_eq!(list[0]["output_dir"], dir.as_str());

        let release = |name: &str| {
            Request::delete(format!("/api/outputs/{}", name))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = send(&app, release(&dir)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!h.tmp.path().join(&dir).exists());

        let (status, _) = send(&app, release(&dir)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
