//! Boundaries to the external generative models.
//!
//! The models themselves are opaque. Handles are produced by a [`ModelLoader`]
//! and write their artifacts into a caller-provided request directory, except
//! WorldGen which hands its asset back for the caller to serialize.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::artifact::WorldAsset;
use crate::error::Result;
use crate::{DevicePreference, SceneClass, WorldMode};

/// Fixed construction settings shared by every handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub device: DevicePreference,
    /// fp8 GEMM quantization (PanoGen / SceneGen)
    pub fp8_gemm: bool,
    /// fp8 attention (PanoGen / SceneGen)
    pub fp8_attention: bool,
    /// WorldGen low-VRAM mode
    pub low_vram: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            device: DevicePreference::Auto,
            fp8_gemm: true,
            fp8_attention: true,
            low_vram: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanoramaRequest<'a> {
    /// Empty for image-conditioned panoramas
    pub prompt: &'a str,
    pub image_path: Option<&'a Path>,
    pub output_dir: &'a Path,
}

#[derive(Debug, Clone)]
pub struct SceneRequest<'a> {
    pub image_path: &'a Path,
    pub labels_fg1: &'a [String],
    pub labels_fg2: &'a [String],
    pub class: SceneClass,
    pub output_dir: &'a Path,
}

#[derive(Debug, Clone, Default)]
pub struct WorldRequest {
    pub prompt: Option<String>,
    pub image_path: Option<PathBuf>,
    pub use_sharp: bool,
    pub return_mesh: bool,
}

/// Writes `panorama.png` into the request directory
#[async_trait]
pub trait PanoramaGenerator: Send + Sync {
    async fn generate(&self, request: PanoramaRequest<'_>) -> Result<()>;

    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes `scene_mesh.glb` into the request directory
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    async fn generate(&self, request: SceneRequest<'_>) -> Result<()>;

    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait WorldGenerator: Send + Sync {
    fn mode(&self) -> WorldMode;

    async fn generate_world(&self, request: WorldRequest) -> Result<WorldAsset>;

    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Constructs model handles
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_panorama(&self, options: &LoadOptions) -> Result<Box<dyn PanoramaGenerator>>;

    async fn load_scene(&self, options: &LoadOptions) -> Result<Box<dyn SceneGenerator>>;

    async fn load_world(
        &self,
        mode: WorldMode,
        options: &LoadOptions,
    ) -> Result<Box<dyn WorldGenerator>>;
}
