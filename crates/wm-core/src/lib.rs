pub mod artifact;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod ply;
mod model_types;

pub use model_types::{Device, DevicePreference, ModelFamily, SceneClass, WorldMode};
