use std::path::Path;

use serde::{Deserialize, Serialize};
use wm_core::{Device, SceneClass, WorldMode};

pub const ARTIFACT_KIND_HEADER: &str = "x-artifact-kind";

#[derive(Debug, Clone, Serialize)]
pub struct HunyuanInit {
    pub device: Device,
    pub fp8_gemm: bool,
    pub fp8_attention: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldGenInit {
    pub mode: WorldMode,
    pub device: Device,
    pub low_vram: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanoramaJob<'a> {
    pub prompt: &'a str,
    pub image_path: Option<&'a Path>,
    pub output_path: &'a Path,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneJob<'a> {
    pub image_path: &'a Path,
    pub labels_fg1: &'a [String],
    pub labels_fg2: &'a [String],
    pub classes: SceneClass,
    pub output_path: &'a Path,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldJob<'a> {
    pub prompt: Option<&'a str>,
    pub image_path: Option<&'a Path>,
    pub use_sharp: bool,
    pub return_mesh: bool,
}

/// Envelope every JSON endpoint of the service answers with
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceResponse {
    #[serde(default)]
    pub status: String,
    pub handle: Option<String>,
    pub output_path: Option<String>,
    pub error: Option<String>,
    pub traceback: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub cuda_available: bool,
}
