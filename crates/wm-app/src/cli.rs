use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use wm_core::DevicePreference;

use crate::config::{AppConfig, Profile};
use crate::outputs::RetentionPolicy;

#[derive(Debug, Parser, Clone, Default)]
#[command(
    name = "worldsmith",
    version,
    about = "Browser studio for HunyuanWorld-1.0 and WorldGen 3D world generation"
)]
pub struct Cli {
    /// Which studio to serve: both model families, or one of them
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on (7860, or 7861 for the worldgen profile)
    #[arg(long)]
    pub port: Option<u16>,

    /// Base URL of the Python model service
    #[arg(long)]
    pub service_url: Option<String>,

    /// Device for model construction: auto, cuda or cpu
    #[arg(long)]
    pub device: Option<DevicePreference>,

    /// Root directory for per-request output directories
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output retention: "keep" or a duration such as "24h"
    #[arg(long)]
    pub retention: Option<RetentionPolicy>,

    /// Leave diagnostic traces out of status messages
    #[arg(long)]
    pub hide_errors: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    let config = AppConfig::load(&args)?;
    crate::server::serve(config).await
}
