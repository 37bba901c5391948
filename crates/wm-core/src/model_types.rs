use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The external model families a registry can hold a handle for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Panorama,
    Scene,
    World,
}

impl ModelFamily {
    /// Model name for display in UI
    pub fn name(&self) -> &str {
        match self {
            Self::Panorama => "HunyuanWorld PanoGen",
            Self::Scene => "HunyuanWorld SceneGen",
            Self::World => "WorldGen",
        }
    }

    /// Model ID for API communication
    pub fn id(&self) -> &str {
        match self {
            Self::Panorama => "panogen",
            Self::Scene => "scenegen",
            Self::World => "worldgen",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::Panorama => "Text or image to 360° panorama (~1-2 min)",
            Self::Scene => "Panorama to layered GLB world mesh (~2-3 min)",
            Self::World => "Text or image to Gaussian splat or mesh (10-30 sec)",
        }
    }

    pub fn features(&self) -> &str {
        match self {
            Self::Panorama => "360° immersive panoramas from a prompt or a photo",
            Self::Scene => "Semantic layering with foreground object labels, mesh export",
            Self::World => "Fast generation, Gaussian splatting, flexible rendering",
        }
    }

    pub fn best_for(&self) -> &str {
        match self {
            Self::Panorama | Self::Scene => {
                "High-quality outdoor and indoor scenes with detailed objects"
            }
            Self::World => "Quick prototyping and diverse scene styles",
        }
    }

    /// Format of the files the family produces
    pub fn output_format(&self) -> &str {
        match self {
            Self::Panorama => "PNG panorama",
            Self::Scene => "GLB mesh",
            Self::World => "PLY (Gaussian splat or mesh)",
        }
    }

    /// Estimated generation time in seconds
    pub fn estimated_time_secs(&self) -> u32 {
        match self {
            Self::Panorama => 90,
            Self::Scene => 150,
            Self::World => 20,
        }
    }
}

/// WorldGen conditioning mode. Switching modes requires a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldMode {
    #[serde(rename = "t2s")]
    TextToScene,
    #[serde(rename = "i2s")]
    ImageToScene,
}

impl WorldMode {
    pub fn id(&self) -> &str {
        match self {
            Self::TextToScene => "t2s",
            Self::ImageToScene => "i2s",
        }
    }
}

impl Default for WorldMode {
    fn default() -> Self {
        Self::TextToScene
    }
}

impl fmt::Display for WorldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneClass {
    Outdoor,
    Indoor,
}

impl SceneClass {
    pub fn id(&self) -> &str {
        match self {
            Self::Outdoor => "outdoor",
            Self::Indoor => "indoor",
        }
    }
}

impl Default for SceneClass {
    fn default() -> Self {
        Self::Outdoor
    }
}

impl FromStr for SceneClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outdoor" => Ok(Self::Outdoor),
            "indoor" => Ok(Self::Indoor),
            other => Err(Error::Parse {
                kind: "scene class",
                value: other.to_string(),
            }),
        }
    }
}

/// Concrete compute device a model is constructed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    pub fn id(&self) -> &str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }
}

/// Configured device choice; `Auto` prefers CUDA when the host has it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Cuda,
    Cpu,
}

impl DevicePreference {
    pub fn resolve(&self, cuda_available: bool) -> Device {
        match self {
            Self::Auto if cuda_available => Device::Cuda,
            Self::Auto => Device::Cpu,
            Self::Cuda => Device::Cuda,
            Self::Cpu => Device::Cpu,
        }
    }
}

impl FromStr for DevicePreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cuda" | "gpu" => Ok(Self::Cuda),
            "cpu" => Ok(Self::Cpu),
            other => Err(Error::Parse {
                kind: "device",
                value: other.to_string(),
            }),
        }
    }
}
