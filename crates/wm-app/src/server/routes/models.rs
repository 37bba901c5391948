use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use wm_core::{ModelFamily, WorldMode};

use crate::config::Profile;
use crate::registry::SlotStatus;
use crate::server::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    profile: String,
    service_url: String,
    retention: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = state.studio.config();
    Json(HealthResponse {
        status: "ok",
        profile: config.profile.id().to_string(),
        service_url: config.service_url.clone(),
        retention: state.studio.outputs().retention().to_string(),
    })
}

#[derive(Serialize)]
pub struct ModelsResponse {
    profile: String,
    models: Vec<SlotStatus>,
    world_mode: Option<WorldMode>,
}

/// Slot states of the model families this profile serves
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let profile = state.studio.config().profile;
    let status = state.studio.registry().status();

    let models = status
        .slots
        .into_iter()
        .filter(|slot| match slot.family {
            ModelFamily::Panorama => profile.has_hunyuan(),
            // the studio profile builds SceneGen per request
            ModelFamily::Scene => profile == Profile::Hunyuan,
            ModelFamily::World => profile.has_worldgen(),
        })
        .collect();

    Json(ModelsResponse {
        profile: profile.id().to_string(),
        models,
        world_mode: status.world_mode,
    })
}
