use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::info;
use wm_core::DevicePreference;
use wm_core::pipeline::LoadOptions;

use crate::cli::Cli;
use crate::outputs::RetentionPolicy;

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// The three studios: both model families, or one of them on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Profile {
    #[default]
    Studio,
    Hunyuan,
    Worldgen,
}

/// How the two-stage pipeline gets its SceneGen instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePolicy {
    /// Constructed for each request after the panorama stage
    PerRequest,
    /// Constructed together with PanoGen by the initializer
    Initialized,
}

impl Profile {
    pub fn id(&self) -> &str {
        match self {
            Self::Studio => "studio",
            Self::Hunyuan => "hunyuan",
            Self::Worldgen => "worldgen",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Studio => "3D World Generation Studio",
            Self::Hunyuan => "HunyuanWorld-1.0 Studio",
            Self::Worldgen => "WorldGen Studio",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Worldgen => 7861,
            _ => 7860,
        }
    }

    pub fn has_hunyuan(&self) -> bool {
        matches!(self, Self::Studio | Self::Hunyuan)
    }

    pub fn has_worldgen(&self) -> bool {
        matches!(self, Self::Studio | Self::Worldgen)
    }

    pub fn scene_policy(&self) -> ScenePolicy {
        match self {
            Self::Hunyuan => ScenePolicy::Initialized,
            _ => ScenePolicy::PerRequest,
        }
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "studio" | "all" => Ok(Self::Studio),
            "hunyuan" | "hunyuanworld" => Ok(Self::Hunyuan),
            "worldgen" => Ok(Self::Worldgen),
            other => Err(anyhow!("unknown profile {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profile: Profile,
    pub host: IpAddr,
    pub port: u16,
    pub service_url: String,
    pub load: LoadOptions,
    pub output_dir: PathBuf,
    pub retention: RetentionPolicy,
    pub sweep_interval: Duration,
    /// Include diagnostic traces in status strings
    pub show_errors: bool,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Defaults, then `.env` / process environment, then CLI flags.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env file"),
        }

        Self::from_sources(cli, |key| env::var(key).ok())
    }

    pub fn from_sources(cli: &Cli, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let profile = match cli.profile {
            Some(p) => p,
            None => parse_var(&var, "WORLDSMITH_PROFILE")?.unwrap_or_default(),
        };

        let host = match cli.host {
            Some(h) => h,
            None => parse_var(&var, "HOST")?.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        };

        let port = match cli.port {
            Some(p) => p,
            None => parse_var(&var, "PORT")?.unwrap_or(profile.default_port()),
        };

        let service_url = cli
            .service_url
            .clone()
            .or_else(|| var("MODEL_SERVICE_URL"))
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        let defaults = LoadOptions::default();
        let load = LoadOptions {
            device: match cli.device {
                Some(d) => d,
                None => parse_var::<DevicePreference>(&var, "DEVICE")?.unwrap_or_default(),
            },
            fp8_gemm: parse_bool(&var, "FP8_GEMM")?.unwrap_or(defaults.fp8_gemm),
            fp8_attention: parse_bool(&var, "FP8_ATTENTION")?.unwrap_or(defaults.fp8_attention),
            low_vram: parse_bool(&var, "LOW_VRAM")?.unwrap_or(defaults.low_vram),
        };

        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| var("OUTPUT_DIR").map(PathBuf::from))
            .unwrap_or_else(|| env::temp_dir().join("worldsmith"));

        let retention = match cli.retention {
            Some(r) => r,
            None => parse_var(&var, "OUTPUT_RETENTION")?.unwrap_or_default(),
        };

        let sweep_interval = match var("SWEEP_INTERVAL") {
            Some(v) => humantime::parse_duration(&v)
                .with_context(|| format!("SWEEP_INTERVAL must be a duration, got {:?}", v))?,
            None => DEFAULT_SWEEP_INTERVAL,
        };

        let show_errors = !cli.hide_errors && parse_bool(&var, "SHOW_ERRORS")?.unwrap_or(true);

        let max_upload_bytes =
            parse_var(&var, "MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            profile,
            host,
            port,
            service_url,
            load,
            output_dir,
            retention,
            sweep_interval,
            show_errors,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(None),
    }
}

fn parse_bool(var: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<bool>> {
    match var(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(anyhow!("{} must be a boolean, got {:?}", key, raw)),
        },
        None => Ok(None),
    }
}
