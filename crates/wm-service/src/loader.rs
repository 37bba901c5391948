use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::info;
use wm_core::error::{Error, Result};
use wm_core::pipeline::{
    LoadOptions, ModelLoader, PanoramaGenerator, SceneGenerator, WorldGenerator,
};
use wm_core::{Device, DevicePreference, ModelFamily, WorldMode};

use crate::client::ServiceClient;
use crate::handles::{RemotePanoGen, RemoteSceneGen, RemoteWorldGen};
use crate::schemas::{HunyuanInit, WorldGenInit};

/// Constructs model handles inside the model service
pub struct RemoteLoader {
    client: Arc<ServiceClient>,
    cuda_available: OnceCell<bool>,
}

impl RemoteLoader {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Arc::new(ServiceClient::new(base_url)?),
            cuda_available: OnceCell::new(),
        })
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Resolve the device, asking the service about CUDA once when set to auto
    async fn device(&self, preference: DevicePreference) -> Result<Device> {
        if preference != DevicePreference::Auto {
            return Ok(preference.resolve(false));
        }

        let cuda = self
            .cuda_available
            .get_or_try_init(|| async {
                let health = self.client.health().await?;
                info!(
                    "Model service at {} reports cuda_available={}",
                    self.client.base_url(),
                    health.cuda_available
                );
                Ok::<_, Error>(health.cuda_available)
            })
            .await?;

        Ok(preference.resolve(*cuda))
    }

    async fn create<B: Serialize>(&self, family: ModelFamily, body: &B) -> Result<String> {
        let resp = self
            .client
            .post_json(&format!("/models/{}", family.id()), body)
            .await?;

        resp.handle.ok_or_else(|| {
            Error::UnexpectedStatus(format!("No handle returned for {}", family.name()))
        })
    }

    async fn hunyuan_init(&self, options: &LoadOptions) -> Result<HunyuanInit> {
        Ok(HunyuanInit {
            device: self.device(options.device).await?,
            fp8_gemm: options.fp8_gemm,
            fp8_attention: options.fp8_attention,
        })
    }
}

#[async_trait]
impl ModelLoader for RemoteLoader {
    async fn load_panorama(&self, options: &LoadOptions) -> Result<Box<dyn PanoramaGenerator>> {
        let init = self.hunyuan_init(options).await?;
        let handle = self.create(ModelFamily::Panorama, &init).await?;
        info!("PanoGen ready on {} as {}", init.device.id(), handle);

        Ok(Box::new(RemotePanoGen {
            client: self.client.clone(),
            handle,
        }))
    }

    async fn load_scene(&self, options: &LoadOptions) -> Result<Box<dyn SceneGenerator>> {
        let init = self.hunyuan_init(options).await?;
        let handle = self.create(ModelFamily::Scene, &init).await?;
        info!("SceneGen ready on {} as {}", init.device.id(), handle);

        Ok(Box::new(RemoteSceneGen {
            client: self.client.clone(),
            handle,
        }))
    }

    async fn load_world(
        &self,
        mode: WorldMode,
        options: &LoadOptions,
    ) -> Result<Box<dyn WorldGenerator>> {
        let init = WorldGenInit {
            mode,
            device: self.device(options.device).await?,
            low_vram: options.low_vram,
        };
        let handle = self.create(ModelFamily::World, &init).await?;
        info!("WorldGen ({}) ready on {} as {}", mode, init.device.id(), handle);

        Ok(Box::new(RemoteWorldGen {
            client: self.client.clone(),
            handle,
            mode,
        }))
    }
}
