use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use wm_core::artifact::WorldAsset;
use wm_core::error::Result;
use wm_core::pipeline::{
    PanoramaGenerator, PanoramaRequest, SceneGenerator, SceneRequest, WorldGenerator, WorldRequest,
};
use wm_core::WorldMode;

use crate::client::ServiceClient;
use crate::schemas::{PanoramaJob, SceneJob, WorldJob};

/// PanoGen instance living inside the model service
pub struct RemotePanoGen {
    pub(crate) client: Arc<ServiceClient>,
    pub(crate) handle: String,
}

#[async_trait]
impl PanoramaGenerator for RemotePanoGen {
    async fn generate(&self, request: PanoramaRequest<'_>) -> Result<()> {
        info!(
            "PanoGen {}: generating panorama into {}",
            self.handle,
            request.output_dir.display()
        );

        let job = PanoramaJob {
            prompt: request.prompt,
            image_path: request.image_path,
            output_path: request.output_dir,
        };
        let resp = self
            .client
            .post_json(&format!("/models/{}/panorama", self.handle), &job)
            .await?;

        if let Some(path) = resp.output_path {
            debug!("PanoGen {} wrote {}", self.handle, path);
        }
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.client.delete(&format!("/models/{}", self.handle)).await
    }
}

/// SceneGen instance living inside the model service
pub struct RemoteSceneGen {
    pub(crate) client: Arc<ServiceClient>,
    pub(crate) handle: String,
}

#[async_trait]
impl SceneGenerator for RemoteSceneGen {
    async fn generate(&self, request: SceneRequest<'_>) -> Result<()> {
        info!(
            "SceneGen {}: {} scene from {} (fg1: {:?}, fg2: {:?})",
            self.handle,
            request.class.id(),
            request.image_path.display(),
            request.labels_fg1,
            request.labels_fg2
        );

        let job = SceneJob {
            image_path: request.image_path,
            labels_fg1: request.labels_fg1,
            labels_fg2: request.labels_fg2,
            classes: request.class,
            output_path: request.output_dir,
        };
        self.client
            .post_json(&format!("/models/{}/scene", self.handle), &job)
            .await?;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.client.delete(&format!("/models/{}", self.handle)).await
    }
}

/// WorldGen instance living inside the model service, fixed to one mode
pub struct RemoteWorldGen {
    pub(crate) client: Arc<ServiceClient>,
    pub(crate) handle: String,
    pub(crate) mode: WorldMode,
}

#[async_trait]
impl WorldGenerator for RemoteWorldGen {
    fn mode(&self) -> WorldMode {
        self.mode
    }

    async fn generate_world(&self, request: WorldRequest) -> Result<WorldAsset> {
        info!(
            "WorldGen {} ({}): use_sharp={}, return_mesh={}",
            self.handle, self.mode, request.use_sharp, request.return_mesh
        );

        let job = WorldJob {
            prompt: request.prompt.as_deref(),
            image_path: request.image_path.as_deref(),
            use_sharp: request.use_sharp,
            return_mesh: request.return_mesh,
        };
        self.client
            .post_for_asset(
                &format!("/models/{}/world", self.handle),
                &job,
                request.return_mesh,
            )
            .await
    }

    async fn release(&self) -> Result<()> {
        self.client.delete(&format!("/models/{}", self.handle)).await
    }
}
