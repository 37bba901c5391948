use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ply::{self, PlySummary};

/// Every file a request directory can hold, with its fixed name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    InputImage,
    Panorama,
    GlbMesh,
    PlyMesh,
    PlySplat,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::InputImage => "input.png",
            Self::Panorama => "panorama.png",
            Self::GlbMesh => "scene_mesh.glb",
            Self::PlyMesh => "scene_mesh.ply",
            Self::PlySplat => "scene_splat.ply",
        }
    }
}

/// Output of a WorldGen call, serialized by the caller
#[derive(Debug, Clone)]
pub enum WorldAsset {
    Mesh(Bytes),
    Splat(Bytes),
}

impl WorldAsset {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Mesh(_) => ArtifactKind::PlyMesh,
            Self::Splat(_) => ArtifactKind::PlySplat,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        match self {
            Self::Mesh(b) | Self::Splat(b) => b,
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Mesh(_))
    }

    /// Parse the PLY header and check it fits the asset type.
    pub fn inspect(&self) -> Result<PlySummary> {
        let summary = ply::inspect(self.bytes())?;
        if summary.vertices == 0 {
            return Err(Error::InvalidArtifact(format!(
                "{} has no vertices",
                self.kind().file_name()
            )));
        }
        Ok(summary)
    }
}
