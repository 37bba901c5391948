use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use wm_core::pipeline::{
    LoadOptions, ModelLoader, PanoramaGenerator, SceneGenerator, WorldGenerator,
};
use wm_core::{ModelFamily, WorldMode};

use crate::error::AppError;

/// Anything a slot can hold. Handles are released before they are replaced.
#[async_trait]
pub trait ModelHandle: Send + Sync {
    async fn release_handle(&self) -> wm_core::error::Result<()>;
}

#[async_trait]
impl ModelHandle for dyn PanoramaGenerator {
    async fn release_handle(&self) -> wm_core::error::Result<()> {
        self.release().await
    }
}

#[async_trait]
impl ModelHandle for dyn SceneGenerator {
    async fn release_handle(&self) -> wm_core::error::Result<()> {
        self.release().await
    }
}

#[async_trait]
impl ModelHandle for dyn WorldGenerator {
    async fn release_handle(&self) -> wm_core::error::Result<()> {
        self.release().await
    }
}

/// At most one live handle for a model family
pub struct Slot<H: ?Sized> {
    family: ModelFamily,
    handle: Option<Box<H>>,
    loads: u64,
}

pub type PanoramaSlot = Slot<dyn PanoramaGenerator>;
pub type SceneSlot = Slot<dyn SceneGenerator>;
pub type WorldSlot = Slot<dyn WorldGenerator>;

impl<H: ModelHandle + ?Sized> Slot<H> {
    fn new(family: ModelFamily) -> Self {
        Self {
            family,
            handle: None,
            loads: 0,
        }
    }

    pub fn get(&self) -> Option<&H> {
        self.handle.as_deref()
    }

    /// The handle, or the user-facing not-initialized error
    pub fn require(&self) -> Result<&H, AppError> {
        self.get().ok_or(AppError::NotInitialized(self.family))
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_some()
    }

    /// Successful constructions so far
    pub fn loads(&self) -> u64 {
        self.loads
    }

    /// Release and drop the current handle, if any.
    pub async fn clear(&mut self) {
        if let Some(old) = self.handle.take() {
            if let Err(e) = old.release_handle().await {
                warn!("Failed to release {} handle: {}", self.family.name(), e);
            }
        }
    }

    /// Release the current handle, then construct a replacement. On failure
    /// the slot is left empty.
    pub async fn reload<F, Fut>(&mut self, load: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = wm_core::error::Result<Box<H>>>,
    {
        self.clear().await;

        let handle = load()
            .await
            .with_context(|| format!("Failed to initialize {}", self.family.name()))?;
        self.handle = Some(handle);
        self.loads += 1;
        Ok(())
    }
}

impl WorldSlot {
    pub fn mode(&self) -> Option<WorldMode> {
        self.get().map(|h| h.mode())
    }

    /// Make sure the held handle runs in `mode`, reconstructing it otherwise.
    /// Returns whether a reconstruction happened.
    pub async fn ensure_mode(
        &mut self,
        loader: &dyn ModelLoader,
        options: &LoadOptions,
        mode: WorldMode,
    ) -> anyhow::Result<bool> {
        let current = self.require()?.mode();
        if current == mode {
            return Ok(false);
        }

        info!("Switching WorldGen from {} to {}", current, mode);
        self.reload(|| loader.load_world(mode, options)).await?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Empty,
    Ready,
    /// Locked by an initialization or generation in progress
    Busy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub family: ModelFamily,
    pub name: String,
    pub description: String,
    pub features: String,
    pub best_for: String,
    pub output_format: String,
    pub estimated_time_secs: u32,
    pub state: SlotState,
    pub loads: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub slots: Vec<SlotStatus>,
    pub world_mode: Option<WorldMode>,
}

/// Model handles owned by the application and shared by every adapter.
///
/// Each slot sits behind its own async mutex, held for the whole of an
/// initialization or generation call. Callers needing both hunyuan slots lock
/// panorama before scene.
pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    options: LoadOptions,
    panorama: Mutex<PanoramaSlot>,
    scene: Mutex<SceneSlot>,
    world: Mutex<WorldSlot>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>, options: LoadOptions) -> Self {
        Self {
            loader,
            options,
            panorama: Mutex::new(Slot::new(ModelFamily::Panorama)),
            scene: Mutex::new(Slot::new(ModelFamily::Scene)),
            world: Mutex::new(Slot::new(ModelFamily::World)),
        }
    }

    pub fn loader(&self) -> &dyn ModelLoader {
        self.loader.as_ref()
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub async fn lock_panorama(&self) -> MutexGuard<'_, PanoramaSlot> {
        self.panorama.lock().await
    }

    pub async fn lock_scene(&self) -> MutexGuard<'_, SceneSlot> {
        self.scene.lock().await
    }

    pub async fn lock_world(&self) -> MutexGuard<'_, WorldSlot> {
        self.world.lock().await
    }

    pub async fn init_panorama(&self) -> anyhow::Result<()> {
        let mut slot = self.lock_panorama().await;
        slot.reload(|| self.loader.load_panorama(&self.options)).await
    }

    /// PanoGen and SceneGen together: both end up ready, or neither does.
    pub async fn init_panorama_and_scene(&self) -> anyhow::Result<()> {
        let mut panorama = self.lock_panorama().await;
        let mut scene = self.lock_scene().await;

        if let Err(e) = panorama
            .reload(|| self.loader.load_panorama(&self.options))
            .await
        {
            scene.clear().await;
            return Err(e);
        }

        if let Err(e) = scene.reload(|| self.loader.load_scene(&self.options)).await {
            panorama.clear().await;
            return Err(e);
        }
        Ok(())
    }

    pub async fn init_world(&self, mode: WorldMode) -> anyhow::Result<()> {
        let mut slot = self.lock_world().await;
        slot.reload(|| self.loader.load_world(mode, &self.options))
            .await
    }

    /// Whether the family's slot is known to hold no handle. A slot locked by
    /// a running call counts as occupied.
    pub fn is_vacant(&self, family: ModelFamily) -> bool {
        fn vacant<H: ModelHandle + ?Sized>(slot: &Mutex<Slot<H>>) -> bool {
            slot.try_lock().map(|s| !s.is_ready()).unwrap_or(false)
        }

        match family {
            ModelFamily::Panorama => vacant(&self.panorama),
            ModelFamily::Scene => vacant(&self.scene),
            ModelFamily::World => vacant(&self.world),
        }
    }

    /// Snapshot for `/api/models`. Slots locked by a running call show as busy.
    pub fn status(&self) -> RegistryStatus {
        fn probe<H: ModelHandle + ?Sized>(
            family: ModelFamily,
            slot: &Mutex<Slot<H>>,
        ) -> SlotStatus {
            let (state, loads) = match slot.try_lock() {
                Ok(s) if s.is_ready() => (SlotState::Ready, Some(s.loads())),
                Ok(s) => (SlotState::Empty, Some(s.loads())),
                Err(_) => (SlotState::Busy, None),
            };
            SlotStatus {
                family,
                name: family.name().to_string(),
                description: family.description().to_string(),
                features: family.features().to_string(),
                best_for: family.best_for().to_string(),
                output_format: family.output_format().to_string(),
                estimated_time_secs: family.estimated_time_secs(),
                state,
                loads,
            }
        }

        let world_mode = self.world.try_lock().ok().and_then(|s| s.mode());

        RegistryStatus {
            slots: vec![
                probe(ModelFamily::Panorama, &self.panorama),
                probe(ModelFamily::Scene, &self.scene),
                probe(ModelFamily::World, &self.world),
            ],
            world_mode,
        }
    }
}
