mod hunyuan;
mod worldgen;

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;
use wm_core::SceneClass;
use wm_core::artifact::ArtifactKind;
use wm_core::pipeline::ModelLoader;
use wm_core::ply::PlySummary;

use crate::config::AppConfig;
use crate::error::{ErrorKind, GenerationError};
use crate::job::{Operation, PendingRequest, RequestLog, RequestStatus};
use crate::outputs::{OutputStore, RequestDir};
use crate::registry::ModelRegistry;

pub const GENERATION_OK: &str = "✅ Generation successful!";

/// Form fields of one generation action
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Near foreground objects, whitespace separated
    pub labels_fg1: Option<String>,
    /// Distant foreground objects, whitespace separated
    pub labels_fg2: Option<String>,
    pub class: SceneClass,
    pub image: Option<Bytes>,
    pub use_sharp: bool,
    pub return_mesh: bool,
}

impl GenerationRequest {
    /// Prompt with surrounding whitespace removed, if anything is left
    fn prompt(&self) -> Option<&str> {
        Some(self.prompt.trim()).filter(|p| !p.is_empty())
    }

    /// Image operations need an upload, text operations a prompt.
    fn validate(&self, operation: Operation) -> Result<(), GenerationError> {
        if operation.uses_image() {
            if self.image.is_none() {
                return Err(GenerationError::invalid_input("Please upload an input image"));
            }
        } else if self.prompt().is_none() {
            return Err(GenerationError::invalid_input("Please enter a prompt"));
        }
        Ok(())
    }
}

#[cfg(test)]
impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn image(data: Bytes) -> Self {
        Self {
            image: Some(data),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub url: String,
}

impl Artifact {
    fn new(dir: &RequestDir, kind: ArtifactKind) -> Self {
        Self {
            kind,
            path: dir.artifact_path(kind),
            url: dir.url(kind),
        }
    }
}

/// Result of the two-stage panorama → mesh pipeline
#[derive(Debug, Clone, Serialize)]
pub struct WorldOutputs {
    pub request_id: Uuid,
    pub output_dir: String,
    pub panorama: Artifact,
    /// Absent when SceneGen finished without writing its mesh
    pub mesh: Option<Artifact>,
    pub status: String,
}

/// Result of a single WorldGen call
#[derive(Debug, Clone, Serialize)]
pub struct SceneOutputs {
    pub request_id: Uuid,
    pub output_dir: String,
    pub artifact: Artifact,
    pub summary: PlySummary,
    /// The WorldGen handle was rebuilt for a different mode first
    pub reconstructed: bool,
    pub status: String,
}

/// Application context: configuration, model handles, outputs and request history
pub struct Studio {
    config: Arc<AppConfig>,
    registry: ModelRegistry,
    outputs: Arc<OutputStore>,
    requests: RequestLog,
}

impl Studio {
    pub fn new(
        config: Arc<AppConfig>,
        loader: Arc<dyn ModelLoader>,
        outputs: Arc<OutputStore>,
    ) -> Self {
        let registry = ModelRegistry::new(loader, config.load.clone());
        Self {
            config,
            registry,
            outputs,
            requests: RequestLog::default(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn outputs(&self) -> &Arc<OutputStore> {
        &self.outputs
    }

    pub fn requests(&self) -> &RequestLog {
        &self.requests
    }

    /// Record the outcome of an accepted request and turn failures into
    /// user-facing errors.
    fn settle<T>(
        &self,
        pending: PendingRequest<'_>,
        result: anyhow::Result<T>,
        status_of: impl FnOnce(&T) -> (RequestStatus, &str),
    ) -> Result<T, GenerationError> {
        match result {
            Ok(outputs) => {
                let (status, message) = status_of(&outputs);
                pending.finish(status, message);
                Ok(outputs)
            }
            Err(e) => {
                error!("Request {} failed: {:?}", pending.id(), e);
                let err = GenerationError::from_error(ErrorKind::GenerationFailed, e);
                pending.finish(RequestStatus::Failed, err.message.as_str());
                Err(err)
            }
        }
    }
}
