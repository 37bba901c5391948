use anyhow::{Context, bail};
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;
use wm_core::ModelFamily;
use wm_core::artifact::ArtifactKind;
use wm_core::labels::parse_labels;
use wm_core::pipeline::{PanoramaGenerator, PanoramaRequest, SceneGenerator, SceneRequest};

use super::{Artifact, GENERATION_OK, GenerationRequest, Studio, WorldOutputs};
use crate::config::ScenePolicy;
use crate::error::{ErrorKind, GenerationError};
use crate::job::{Operation, RequestStatus};
use crate::outputs::{HUNYUAN_PREFIX, InputImage};

pub const HUNYUAN_READY: &str = "✅ HunyuanWorld-1.0 initialized successfully!";

impl Studio {
    fn hunyuan_not_ready(&self) -> GenerationError {
        GenerationError::not_initialized(match self.config.profile.scene_policy() {
            ScenePolicy::PerRequest => "Please initialize HunyuanWorld-1.0 first!",
            ScenePolicy::Initialized => "Please initialize models first!",
        })
    }

    /// Construct PanoGen, plus SceneGen when the profile keeps one around.
    pub async fn initialize_hunyuan(&self) -> Result<String, GenerationError> {
        info!("Initializing HunyuanWorld-1.0");
        let result = match self.config.profile.scene_policy() {
            ScenePolicy::PerRequest => self.registry.init_panorama().await,
            ScenePolicy::Initialized => self.registry.init_panorama_and_scene().await,
        };

        match result {
            Ok(()) => {
                info!("HunyuanWorld-1.0 ready");
                Ok(HUNYUAN_READY.to_string())
            }
            Err(e) => {
                error!("HunyuanWorld-1.0 initialization failed: {:?}", e);
                Err(GenerationError::from_error(ErrorKind::InitializationFailed, e))
            }
        }
    }

    pub async fn text_to_world(
        &self,
        request: GenerationRequest,
    ) -> Result<WorldOutputs, GenerationError> {
        self.run_world(Operation::TextToWorld, request).await
    }

    pub async fn image_to_world(
        &self,
        request: GenerationRequest,
    ) -> Result<WorldOutputs, GenerationError> {
        self.run_world(Operation::ImageToWorld, request).await
    }

    async fn run_world(
        &self,
        operation: Operation,
        request: GenerationRequest,
    ) -> Result<WorldOutputs, GenerationError> {
        let keeps_scene = self.config.profile.scene_policy() == ScenePolicy::Initialized;
        if self.registry.is_vacant(ModelFamily::Panorama)
            || (keeps_scene && self.registry.is_vacant(ModelFamily::Scene))
        {
            return Err(self.hunyuan_not_ready());
        }
        request.validate(operation)?;

        let panorama = self.registry.lock_panorama().await;
        let Some(pano_gen) = panorama.get() else {
            return Err(self.hunyuan_not_ready());
        };

        let scene = match self.config.profile.scene_policy() {
            ScenePolicy::Initialized => {
                let slot = self.registry.lock_scene().await;
                if !slot.is_ready() {
                    return Err(self.hunyuan_not_ready());
                }
                Some(slot)
            }
            ScenePolicy::PerRequest => None,
        };

        let pending = self.requests.begin(operation);
        let scene_gen = scene.as_ref().and_then(|slot| slot.get());
        let result = self
            .world_pipeline(pending.id(), pano_gen, scene_gen, &request)
            .await;

        self.settle(pending, result, |out| match out.mesh {
            Some(_) => (RequestStatus::Succeeded, out.status.as_str()),
            None => (RequestStatus::Warning, out.status.as_str()),
        })
    }

    async fn world_pipeline(
        &self,
        id: Uuid,
        pano_gen: &dyn PanoramaGenerator,
        scene_gen: Option<&dyn SceneGenerator>,
        request: &GenerationRequest,
    ) -> anyhow::Result<WorldOutputs> {
        let dir = self.outputs.create(HUNYUAN_PREFIX, id).await?;
        self.requests.attach_dir(id, &dir.name);

        let input_path = match &request.image {
            Some(data) => {
                let image = InputImage::decode(data.clone()).await?;
                Some(self.outputs.write_input_image(&dir, image).await?)
            }
            None => None,
        };
        // image-conditioned panoramas take no prompt
        let prompt = match input_path {
            Some(_) => "",
            None => request.prompt().unwrap_or_default(),
        };

        info!("Generating panorama into {}", dir.path.display());
        pano_gen
            .generate(PanoramaRequest {
                prompt,
                image_path: input_path.as_deref(),
                output_dir: &dir.path,
            })
            .await
            .context("Panorama generation failed")?;

        let panorama = Artifact::new(&dir, ArtifactKind::Panorama);
        if !fs::try_exists(&panorama.path).await? {
            bail!(
                "Panorama generation finished without writing {}",
                panorama.path.display()
            );
        }

        let labels_fg1 = parse_labels(request.labels_fg1.as_deref());
        let labels_fg2 = parse_labels(request.labels_fg2.as_deref());
        let scene_request = SceneRequest {
            image_path: &panorama.path,
            labels_fg1: &labels_fg1,
            labels_fg2: &labels_fg2,
            class: request.class,
            output_dir: &dir.path,
        };

        info!(
            "Generating {} scene mesh (fg1: {:?}, fg2: {:?})",
            request.class.id(),
            labels_fg1,
            labels_fg2
        );
        match scene_gen {
            Some(scene_gen) => scene_gen
                .generate(scene_request)
                .await
                .context("Scene generation failed")?,
            None => {
                let scene_gen = self
                    .registry
                    .loader()
                    .load_scene(self.registry.options())
                    .await
                    .context("Failed to initialize HunyuanWorld SceneGen")?;
                let generated = scene_gen.generate(scene_request).await;
                if let Err(e) = scene_gen.release().await {
                    warn!("Failed to release per-request SceneGen: {}", e);
                }
                generated.context("Scene generation failed")?;
            }
        }

        let mesh = Artifact::new(&dir, ArtifactKind::GlbMesh);
        let (mesh, status) = if fs::try_exists(&mesh.path).await? {
            info!("Generated {}", mesh.path.display());
            (Some(mesh), GENERATION_OK.to_string())
        } else {
            warn!("Mesh not found in {}", dir.path.display());
            (
                None,
                format!("⚠️ Panorama generated, mesh not found in: {}", dir.path.display()),
            )
        };

        Ok(WorldOutputs {
            request_id: dir.id,
            output_dir: dir.name,
            panorama,
            mesh,
            status,
        })
    }
}
