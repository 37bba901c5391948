//! Mock model handles and a studio wired to them.

use std::io::Cursor;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tokio::sync::Notify;
use wm_core::artifact::{ArtifactKind, WorldAsset};
use wm_core::error::{Error, Result};
use wm_core::pipeline::{
    LoadOptions, ModelLoader, PanoramaGenerator, PanoramaRequest, SceneGenerator, SceneRequest,
    WorldGenerator, WorldRequest,
};
use wm_core::{SceneClass, WorldMode};

use crate::cli::Cli;
use crate::config::{AppConfig, Profile};
use crate::outputs::{OutputStore, RetentionPolicy};
use crate::studio::Studio;

pub const MESH_PLY: &[u8] = b"ply\n\
format ascii 1.0\n\
element vertex 3\n\
property float x\n\
property float y\n\
property float z\n\
element face 1\n\
property list uchar int vertex_indices\n\
end_header\n\
0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";

pub const SPLAT_PLY: &[u8] = b"ply\n\
format ascii 1.0\n\
element vertex 1\n\
property float x\n\
property float y\n\
property float z\n\
property float f_dc_0\n\
property float opacity\n\
property float scale_0\n\
property float rot_0\n\
end_header\n\
0 0 0 0.5 0.9 0.1 1\n";

pub fn png_bytes() -> Bytes {
    let img = RgbImage::from_pixel(4, 2, Rgb([10, 200, 30]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

fn oom() -> Error {
    Error::Service {
        message: "CUDA out of memory".into(),
        traceback: Some("Traceback (most recent call last):\n  File \"service.py\"".into()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneCall {
    pub labels_fg1: Vec<String>,
    pub labels_fg2: Vec<String>,
    pub class: SceneClass,
}

/// Failure switches and a record of everything the mocks were asked to do
#[derive(Default)]
pub struct MockState {
    pub fail_panorama: AtomicBool,
    pub fail_scene: AtomicBool,
    pub fail_world: AtomicBool,
    pub fail_generation: AtomicBool,
    /// PanoGen returns without writing panorama.png
    pub skip_panorama: AtomicBool,
    /// SceneGen returns without writing scene_mesh.glb
    pub skip_mesh: AtomicBool,
    /// WorldGen generation waits for `world_gate` after announcing itself on
    /// `world_started`
    pub hold_world: AtomicBool,
    pub world_started: Notify,
    pub world_gate: Notify,
    events: Mutex<Vec<String>>,
    panorama_prompts: Mutex<Vec<String>>,
    scene_calls: Mutex<Vec<SceneCall>>,
    world_requests: Mutex<Vec<WorldRequest>>,
}

impl MockState {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(oom())
        } else {
            Ok(())
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn panorama_prompts(&self) -> Vec<String> {
        self.panorama_prompts.lock().unwrap().clone()
    }

    pub fn scene_calls(&self) -> Vec<SceneCall> {
        self.scene_calls.lock().unwrap().clone()
    }

    pub fn world_requests(&self) -> Vec<WorldRequest> {
        self.world_requests.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MockLoader {
    state: Arc<MockState>,
}

impl Deref for MockLoader {
    type Target = MockState;

    fn deref(&self) -> &MockState {
        &self.state
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load_panorama(&self, _options: &LoadOptions) -> Result<Box<dyn PanoramaGenerator>> {
        self.check(&self.fail_panorama)?;
        self.record("load panorama");
        Ok(Box::new(MockPanoGen(self.state.clone())))
    }

    async fn load_scene(&self, _options: &LoadOptions) -> Result<Box<dyn SceneGenerator>> {
        self.check(&self.fail_scene)?;
        self.record("load scene");
        Ok(Box::new(MockSceneGen(self.state.clone())))
    }

    async fn load_world(
        &self,
        mode: WorldMode,
        _options: &LoadOptions,
    ) -> Result<Box<dyn WorldGenerator>> {
        self.check(&self.fail_world)?;
        self.record(format!("load world {}", mode));
        Ok(Box::new(MockWorldGen {
            state: self.state.clone(),
            mode,
        }))
    }
}

struct MockPanoGen(Arc<MockState>);

#[async_trait]
impl PanoramaGenerator for MockPanoGen {
    async fn generate(&self, request: PanoramaRequest<'_>) -> Result<()> {
        self.0.check(&self.0.fail_generation)?;
        if let Some(image) = request.image_path {
            assert!(image.exists(), "input image should be on disk");
        }
        self.0.record("generate panorama");
        self.0.panorama_prompts.lock().unwrap().push(request.prompt.to_string());

        if !self.0.skip_panorama.load(Ordering::SeqCst) {
            let path = request.output_dir.join(ArtifactKind::Panorama.file_name());
            tokio::fs::write(path, png_bytes()).await?;
        }
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.0.record("release panorama");
        Ok(())
    }
}

struct MockSceneGen(Arc<MockState>);

#[async_trait]
impl SceneGenerator for MockSceneGen {
    async fn generate(&self, request: SceneRequest<'_>) -> Result<()> {
        self.0.check(&self.0.fail_generation)?;
        assert!(request.image_path.ends_with("panorama.png"));
        self.0.record("generate scene");
        self.0.scene_calls.lock().unwrap().push(SceneCall {
            labels_fg1: request.labels_fg1.to_vec(),
            labels_fg2: request.labels_fg2.to_vec(),
            class: request.class,
        });

        if !self.0.skip_mesh.load(Ordering::SeqCst) {
            let path = request.output_dir.join(ArtifactKind::GlbMesh.file_name());
            tokio::fs::write(path, b"glTF").await?;
        }
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.0.record("release scene");
        Ok(())
    }
}

struct MockWorldGen {
    state: Arc<MockState>,
    mode: WorldMode,
}

#[async_trait]
impl WorldGenerator for MockWorldGen {
    fn mode(&self) -> WorldMode {
        self.mode
    }

    async fn generate_world(&self, request: WorldRequest) -> Result<WorldAsset> {
        self.state.check(&self.state.fail_generation)?;
        self.state.record(format!("generate world {}", self.mode));
        if self.state.hold_world.load(Ordering::SeqCst) {
            self.state.world_started.notify_one();
            self.state.world_gate.notified().await;
        }
        let return_mesh = request.return_mesh;
        self.state.world_requests.lock().unwrap().push(request);

        Ok(if return_mesh {
            WorldAsset::Mesh(Bytes::from_static(MESH_PLY))
        } else {
            WorldAsset::Splat(Bytes::from_static(SPLAT_PLY))
        })
    }

    async fn release(&self) -> Result<()> {
        self.state.record(format!("release world {}", self.mode));
        Ok(())
    }
}

pub struct Harness {
    pub studio: Arc<Studio>,
    pub loader: Arc<MockLoader>,
    pub tmp: TempDir,
}

pub async fn harness(profile: Profile) -> Harness {
    let tmp = TempDir::new().unwrap();

    let mut config = AppConfig::from_sources(&Cli::default(), |_| None).unwrap();
    config.profile = profile;
    config.output_dir = tmp.path().to_path_buf();
    config.retention = RetentionPolicy::Keep;

    let outputs = OutputStore::open(&config.output_dir, config.retention)
        .await
        .unwrap();
    let loader = Arc::new(MockLoader::default());
    let studio = Studio::new(Arc::new(config), loader.clone(), Arc::new(outputs));

    Harness {
        studio: Arc::new(studio),
        loader,
        tmp,
    }
}
