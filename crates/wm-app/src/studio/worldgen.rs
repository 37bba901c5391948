use anyhow::{Context, bail};
use tracing::{error, info};
use uuid::Uuid;
use wm_core::{ModelFamily, WorldMode};
use wm_core::pipeline::WorldRequest;

use super::{Artifact, GENERATION_OK, GenerationRequest, SceneOutputs, Studio};
use crate::error::{ErrorKind, GenerationError};
use crate::job::{Operation, RequestStatus};
use crate::outputs::{InputImage, WORLDGEN_PREFIX};
use crate::registry::WorldSlot;

pub const WORLDGEN_READY: &str = "✅ WorldGen initialized successfully!";
const WORLDGEN_NOT_READY: &str = "Please initialize WorldGen first!";

impl Studio {
    /// Construct WorldGen in text-to-scene mode, replacing any existing handle.
    pub async fn initialize_worldgen(&self) -> Result<String, GenerationError> {
        let mode = WorldMode::default();
        info!("Initializing WorldGen ({})", mode);

        match self.registry.init_world(mode).await {
            Ok(()) => {
                info!("WorldGen ready");
                Ok(WORLDGEN_READY.to_string())
            }
            Err(e) => {
                error!("WorldGen initialization failed: {:?}", e);
                Err(GenerationError::from_error(ErrorKind::InitializationFailed, e))
            }
        }
    }

    pub async fn text_to_scene(
        &self,
        request: GenerationRequest,
    ) -> Result<SceneOutputs, GenerationError> {
        self.run_scene(Operation::TextToScene, request).await
    }

    /// The prompt is optional here and passed along when present.
    pub async fn image_to_scene(
        &self,
        request: GenerationRequest,
    ) -> Result<SceneOutputs, GenerationError> {
        self.run_scene(Operation::ImageToScene, request).await
    }

    async fn run_scene(
        &self,
        operation: Operation,
        request: GenerationRequest,
    ) -> Result<SceneOutputs, GenerationError> {
        if self.registry.is_vacant(ModelFamily::World) {
            return Err(GenerationError::not_initialized(WORLDGEN_NOT_READY));
        }
        request.validate(operation)?;

        let mut slot = self.registry.lock_world().await;
        if !slot.is_ready() {
            return Err(GenerationError::not_initialized(WORLDGEN_NOT_READY));
        }

        let pending = self.requests.begin(operation);
        let result = self
            .scene_pipeline(pending.id(), operation, &mut slot, &request)
            .await;

        self.settle(pending, result, |out| (RequestStatus::Succeeded, out.status.as_str()))
    }

    async fn scene_pipeline(
        &self,
        id: Uuid,
        operation: Operation,
        slot: &mut WorldSlot,
        request: &GenerationRequest,
    ) -> anyhow::Result<SceneOutputs> {
        let reconstructed = slot
            .ensure_mode(
                self.registry.loader(),
                self.registry.options(),
                operation.world_mode(),
            )
            .await?;

        let dir = self.outputs.create(WORLDGEN_PREFIX, id).await?;
        self.requests.attach_dir(id, &dir.name);

        let image_path = match &request.image {
            Some(data) => {
                let image = InputImage::decode(data.clone()).await?;
                Some(self.outputs.write_input_image(&dir, image).await?)
            }
            None => None,
        };

        let world_gen = slot.require()?;
        info!(
            "Generating {} with WorldGen ({})",
            if request.return_mesh { "mesh" } else { "splat" },
            world_gen.mode()
        );
        let asset = world_gen
            .generate_world(WorldRequest {
                prompt: request.prompt().map(str::to_string),
                image_path,
                use_sharp: request.use_sharp,
                return_mesh: request.return_mesh,
            })
            .await
            .context("WorldGen generation failed")?;

        if asset.is_mesh() != request.return_mesh {
            bail!(
                "WorldGen returned a {} although a {} was requested",
                if asset.is_mesh() { "mesh" } else { "splat" },
                if request.return_mesh { "mesh" } else { "splat" }
            );
        }

        let summary = asset
            .inspect()
            .context("WorldGen returned an unusable asset")?;
        let path = self.outputs.write(&dir, asset.kind(), asset.bytes()).await?;
        info!(
            "Wrote {} ({} vertices, {} faces, {})",
            path.display(),
            summary.vertices,
            summary.faces,
            summary.encoding
        );

        Ok(SceneOutputs {
            request_id: dir.id,
            output_dir: dir.name.clone(),
            artifact: Artifact::new(&dir, asset.kind()),
            summary,
            reconstructed,
            status: GENERATION_OK.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use tokio::time::{sleep, timeout};
    use wm_core::artifact::ArtifactKind;

    use super::*;
    use crate::config::Profile;
    use crate::job::ABANDONED;
    use crate::registry::SlotState;
    use crate::testing::{Harness, harness, png_bytes};

    /// Start a text-to-scene request that stays inside WorldGen until
    /// `world_gate` is notified.
    async fn held_generation(
        h: &Harness,
    ) -> tokio::task::JoinHandle<Result<SceneOutputs, GenerationError>> {
        h.studio.initialize_worldgen().await.unwrap();
        h.loader.hold_world.store(true, Ordering::SeqCst);

        let studio = h.studio.clone();
        let task = tokio::spawn(async move {
            studio
                .text_to_scene(GenerationRequest::text("a forest"))
                .await
        });
        h.loader.world_started.notified().await;
        task
    }

    #[tokio::test]
    async fn test_generation_before_init_asks_for_initialization() {
        let h = harness(Profile::Worldgen).await;
        for result in [
            h.studio.text_to_scene(GenerationRequest::text("a forest")).await,
            h.studio.image_to_scene(GenerationRequest::image(png_bytes())).await,
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.kind, ErrorKind::NotInitialized);
            assert_eq!(err.status(true), WORLDGEN_NOT_READY);
        }
        assert!(h.loader.events().is_empty());
    }

    #[tokio::test]
    async fn test_image_request_switches_mode_and_back() {
        let h = harness(Profile::Worldgen).await;
        assert_eq!(h.studio.initialize_worldgen().await.unwrap(), WORLDGEN_READY);

        let out = h
            .studio
            .image_to_scene(GenerationRequest::image(png_bytes()))
            .await
            .unwrap();
        assert!(out.reconstructed);

        let out = h
            .studio
            .text_to_scene(GenerationRequest::text("a forest"))
            .await
            .unwrap();
        assert!(out.reconstructed);

        let out = h
            .studio
            .text_to_scene(GenerationRequest::text("a desert"))
            .await
            .unwrap();
        assert!(!out.reconstructed);

        assert_eq!(
            h.loader.events(),
            vec![
                "load world t2s",
                "release world t2s",
                "load world i2s",
                "generate world i2s",
                "release world i2s",
                "load world t2s",
                "generate world t2s",
                "generate world t2s",
            ]
        );
    }

    #[tokio::test]
    async fn test_output_names_follow_asset_type() {
        let h = harness(Profile::Worldgen).await;
        h.studio.initialize_worldgen().await.unwrap();

        let splat = h
            .studio
            .text_to_scene(GenerationRequest::text("a forest"))
            .await
            .unwrap();
        assert_eq!(splat.artifact.kind, ArtifactKind::PlySplat);
        assert!(splat.artifact.path.ends_with("scene_splat.ply"));
        assert!(splat.artifact.path.exists());
        assert!(splat.summary.gaussian_splat);
        assert!(splat.output_dir.starts_with("worldgen_"));

        let request = GenerationRequest {
            return_mesh: true,
            use_sharp: true,
            ..GenerationRequest::text("a forest")
        };
        let mesh = h.studio.text_to_scene(request).await.unwrap();
        assert!(mesh.artifact.path.ends_with("scene_mesh.ply"));
        assert_eq!(mesh.summary.faces, 1);
        assert_ne!(mesh.output_dir, splat.output_dir);

        let sent = h.loader.world_requests();
        assert_eq!(sent[1].prompt.as_deref(), Some("a forest"));
        assert!(sent[1].use_sharp);
    }

    #[tokio::test]
    async fn test_image_request_passes_optional_prompt() {
        let h = harness(Profile::Studio).await;
        h.studio.initialize_worldgen().await.unwrap();

        let request = GenerationRequest {
            prompt: "  ".into(),
            ..GenerationRequest::image(png_bytes())
        };
        h.studio.image_to_scene(request).await.unwrap();

        let sent = h.loader.world_requests();
        assert_eq!(sent[0].prompt, None);
        assert!(sent[0].image_path.as_ref().unwrap().ends_with("input.png"));
    }

    #[tokio::test]
    async fn test_failed_mode_switch_needs_reinitialization() {
        let h = harness(Profile::Worldgen).await;
        h.studio.initialize_worldgen().await.unwrap();
        h.loader.fail_world.store(true, Ordering::SeqCst);

        let err = h
            .studio
            .image_to_scene(GenerationRequest::image(png_bytes()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::GenerationFailed);
        assert!(err.status(true).contains("Failed to initialize WorldGen"));

        let err = h
            .studio
            .text_to_scene(GenerationRequest::text("a forest"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotInitialized);
    }

    #[tokio::test]
    async fn test_failed_initialization_returns_trace() {
        let h = harness(Profile::Worldgen).await;
        h.loader.fail_world.store(true, Ordering::SeqCst);

        let err = h.studio.initialize_worldgen().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InitializationFailed);
        assert!(err.status(true).contains("Model service traceback"));
        assert!(!err.status(false).contains("Model service traceback"));
    }

    #[tokio::test]
    async fn test_reinitialization_waits_for_running_generation() {
        let h = harness(Profile::Worldgen).await;
        let generation = held_generation(&h).await;

        let studio = h.studio.clone();
        let init = tokio::spawn(async move { studio.initialize_worldgen().await });
        sleep(Duration::from_millis(50)).await;

        assert!(!init.is_finished());
        assert_eq!(h.studio.registry().status().slots[2].state, SlotState::Busy);

        h.loader.world_gate.notify_one();
        generation.await.unwrap().unwrap();
        assert_eq!(init.await.unwrap().unwrap(), WORLDGEN_READY);

        assert_eq!(
            h.loader.events(),
            vec![
                "load world t2s",
                "generate world t2s",
                "release world t2s",
                "load world t2s",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_while_slot_is_busy() {
        let h = harness(Profile::Worldgen).await;
        let generation = held_generation(&h).await;

        let rejected = timeout(
            Duration::from_secs(1),
            h.studio.text_to_scene(GenerationRequest::text("   ")),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert_eq!(rejected.kind, ErrorKind::InvalidInput);

        let rejected = timeout(
            Duration::from_secs(1),
            h.studio.image_to_scene(GenerationRequest::default()),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert_eq!(rejected.kind, ErrorKind::InvalidInput);

        h.loader.world_gate.notify_one();
        generation.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_uninitialized_wins_over_invalid_input() {
        let h = harness(Profile::Worldgen).await;
        let err = h
            .studio
            .text_to_scene(GenerationRequest::text(""))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotInitialized);
    }

    #[tokio::test]
    async fn test_cancelled_request_is_recorded_as_failed() {
        let h = harness(Profile::Worldgen).await;
        let generation = held_generation(&h).await;

        generation.abort();
        assert!(generation.await.unwrap_err().is_cancelled());

        let records = h.studio.requests().list();
        assert_eq!(records[0].status, RequestStatus::Failed);
        assert_eq!(records[0].message.as_deref(), Some(ABANDONED));
        assert!(h.studio.registry().lock_world().await.is_ready());
    }
}
