use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wm_core::artifact::ArtifactKind;

use crate::error::AppError;

pub const HUNYUAN_PREFIX: &str = "hunyuan_";
pub const WORLDGEN_PREFIX: &str = "worldgen_";

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// How long request directories survive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Never delete
    Keep,
    /// Delete once the directory is older than this
    Ttl(Duration),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::Ttl(DEFAULT_TTL)
    }
}

impl FromStr for RetentionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "forever" => Ok(Self::Keep),
            other => humantime::parse_duration(other)
                .map(Self::Ttl)
                .map_err(|e| anyhow!("expected \"keep\" or a duration like \"24h\": {}", e)),
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "keep"),
            Self::Ttl(ttl) => write!(f, "{}", humantime::format_duration(*ttl)),
        }
    }
}

/// A freshly created directory owned by one request
#[derive(Debug, Clone)]
pub struct RequestDir {
    pub id: Uuid,
    pub name: String,
    pub path: PathBuf,
}

impl RequestDir {
    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.path.join(kind.file_name())
    }

    /// Where the server exposes the artifact
    pub fn url(&self, kind: ArtifactKind) -> String {
        format!("/outputs/{}/{}", self.name, kind.file_name())
    }
}

/// An uploaded image that decoded successfully
pub struct InputImage(DynamicImage);

impl InputImage {
    pub async fn decode(data: Bytes) -> Result<Self, AppError> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("Please upload an input image".into()));
        }

        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&data))
            .await
            .map_err(|e| AppError::BackendError(format!("image decoder panicked: {}", e)))?;

        decoded
            .map(Self)
            .map_err(|e| AppError::InvalidInput(format!("Could not decode the uploaded image: {}", e)))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.0.width(), self.0.height())
    }
}

pub struct OutputStore {
    root: PathBuf,
    retention: RetentionPolicy,
}

impl OutputStore {
    pub async fn open(root: impl Into<PathBuf>, retention: RetentionPolicy) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create output root {}", root.display()))?;

        info!("Writing outputs to {} (retention: {})", root.display(), retention);
        Ok(Self { root, retention })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Create `<root>/<prefix><id>`. Fails rather than reuse an existing directory.
    pub async fn create(&self, prefix: &str, id: Uuid) -> anyhow::Result<RequestDir> {
        let name = format!("{}{}", prefix, id);
        let path = self.root.join(&name);
        fs::create_dir(&path)
            .await
            .with_context(|| format!("Failed to create request directory {}", path.display()))?;

        debug!("Created {}", path.display());
        Ok(RequestDir { id, name, path })
    }

    pub async fn write(
        &self,
        dir: &RequestDir,
        kind: ArtifactKind,
        data: &[u8],
    ) -> anyhow::Result<PathBuf> {
        let path = dir.artifact_path(kind);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Re-encode the upload as `input.png`
    pub async fn write_input_image(
        &self,
        dir: &RequestDir,
        image: InputImage,
    ) -> anyhow::Result<PathBuf> {
        let path = dir.artifact_path(ArtifactKind::InputImage);
        let (width, height) = image.dimensions();
        debug!("Saving {}x{} input image to {}", width, height, path.display());

        let target = path.clone();
        tokio::task::spawn_blocking(move || image.0.save_with_format(&target, ImageFormat::Png))
            .await?
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Delete one request directory by name
    pub async fn release(&self, name: &str) -> anyhow::Result<()> {
        if !is_request_dir_name(name) {
            return Err(AppError::UnknownOutput(name.to_string()).into());
        }

        let path = self.root.join(name);
        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                info!("Released {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::UnknownOutput(name.to_string()).into())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Remove request directories older than the TTL. Returns how many went.
    pub async fn sweep(&self) -> anyhow::Result<usize> {
        let ttl = match self.retention {
            RetentionPolicy::Keep => return Ok(0),
            RetentionPolicy::Ttl(ttl) => ttl,
        };

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_request_dir_name(name) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|m| m.elapsed().ok())
                .unwrap_or_default();
            if age < ttl {
                continue;
            }

            match fs::remove_dir_all(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove expired {}: {}", name, e),
            }
        }

        if removed > 0 {
            info!("Swept {} expired request directories", removed);
        }
        Ok(removed)
    }

    /// Run `sweep` every `interval` until the process exits. Nothing to do under `keep`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        if self.retention == RetentionPolicy::Keep {
            return None;
        }

        let store = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(MIN_SWEEP_INTERVAL));
            loop {
                ticker.tick().await;
                if let Err(e) = store.sweep().await {
                    warn!("Output sweep failed: {:#}", e);
                }
            }
        }))
    }
}

fn is_request_dir_name(name: &str) -> bool {
    let suffix = name
        .strip_prefix(HUNYUAN_PREFIX)
        .or_else(|| name.strip_prefix(WORLDGEN_PREFIX));

    match suffix {
        Some(id) => Uuid::parse_str(id).is_ok(),
        None => false,
    }
}
