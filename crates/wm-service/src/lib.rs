//! Client for the Python model service hosting HunyuanWorld and WorldGen.

mod client;
mod handles;
mod loader;
mod schemas;

pub use client::ServiceClient;
pub use loader::RemoteLoader;
