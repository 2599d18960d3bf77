//! Pipeline configuration loading and resolution
//!
//! The configuration is constructed once at process start and passed into
//! each stage's constructor. Core logic never consults the environment or
//! any other ambient state directly.
//!
//! Value resolution priority: command line > environment > TOML > default.
//! A missing TOML file degrades to defaults with a warning; a TOML file that
//! was named explicitly but cannot be read is a configuration error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Default scrape window when none is configured
const DEFAULT_MESSAGE_LIMIT: usize = 50;

/// Default gateway endpoint (local sidecar)
const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8787";

/// Default detection command on PATH
const DEFAULT_DETECTOR_COMMAND: &str = "yolo-detect";

/// Default confidence floor for persisted detections
const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;

/// TOML config file shape (all fields optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub data_root: Option<PathBuf>,
    #[serde(default)]
    pub telegram: TelegramToml,
    #[serde(default)]
    pub detector: DetectorToml,
    #[serde(default)]
    pub enrich: EnrichToml,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramToml {
    pub gateway_url: Option<String>,
    pub access_token: Option<String>,
    pub channel: Option<String>,
    pub message_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorToml {
    pub command: Option<String>,
    pub names_file: Option<PathBuf>,
    pub min_confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrichToml {
    pub rerun: Option<RerunPolicy>,
}

/// What a repeated enrichment run does to previously persisted facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerunPolicy {
    /// Clear the fact table at the start of the run (snapshot semantics)
    Replace,
    /// Keep prior facts; re-runs accumulate additional rows
    Append,
}

impl FromStr for RerunPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(RerunPolicy::Replace),
            "append" => Ok(RerunPolicy::Append),
            other => Err(format!(
                "unknown rerun policy '{}' (expected 'replace' or 'append')",
                other
            )),
        }
    }
}

/// Values supplied on the command line, passed through by each binary
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub data_root: Option<PathBuf>,
    pub channel: Option<String>,
    pub message_limit: Option<usize>,
    pub gateway_url: Option<String>,
    pub rerun: Option<RerunPolicy>,
}

/// Channel gateway settings consumed by the acquire stage
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub gateway_url: String,
    pub access_token: Option<String>,
    pub channel: Option<String>,
    pub message_limit: usize,
}

/// Detector settings consumed by the enrich stage
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub command: String,
    pub names_file: Option<PathBuf>,
    pub min_confidence: f32,
}

/// Resolved pipeline configuration, shared by all stages
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_root: PathBuf,
    pub telegram: TelegramConfig,
    pub detector: DetectorConfig,
    pub rerun: RerunPolicy,
}

impl PipelineConfig {
    /// Resolve the full configuration from CLI overrides, environment,
    /// TOML file, and compiled defaults, in that priority order.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let toml = load_toml(overrides.config_file.as_deref())?;

        let data_root = overrides
            .data_root
            .or_else(|| env_path("TGPIPE_DATA_ROOT"))
            .or(toml.data_root)
            .unwrap_or_else(default_data_root);

        let telegram = TelegramConfig {
            gateway_url: overrides
                .gateway_url
                .or_else(|| env_string("TGPIPE_GATEWAY_URL"))
                .or(toml.telegram.gateway_url)
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            access_token: env_string("TGPIPE_GATEWAY_TOKEN").or(toml.telegram.access_token),
            channel: overrides
                .channel
                .or_else(|| env_string("TGPIPE_CHANNEL"))
                .or(toml.telegram.channel),
            message_limit: overrides
                .message_limit
                .or_else(|| env_parsed("TGPIPE_MESSAGE_LIMIT"))
                .or(toml.telegram.message_limit)
                .unwrap_or(DEFAULT_MESSAGE_LIMIT),
        };

        let detector = DetectorConfig {
            command: env_string("TGPIPE_DETECTOR_CMD")
                .or(toml.detector.command)
                .unwrap_or_else(|| DEFAULT_DETECTOR_COMMAND.to_string()),
            names_file: env_path("TGPIPE_DETECTOR_NAMES").or(toml.detector.names_file),
            min_confidence: toml
                .detector
                .min_confidence
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
        };

        let rerun = overrides
            .rerun
            .or(toml.enrich.rerun)
            .unwrap_or(RerunPolicy::Replace);

        Ok(PipelineConfig {
            data_root,
            telegram,
            detector,
            rerun,
        })
    }

    /// Main store (default schema; holds the upstream fact tables)
    pub fn database_path(&self) -> PathBuf {
        self.data_root.join("tgpipe.db")
    }

    /// Raw layer store, attached as schema `raw`
    pub fn raw_layer_path(&self) -> PathBuf {
        self.data_root.join("raw.db")
    }

    /// Enriched layer store, attached as schema `enriched`
    pub fn enriched_layer_path(&self) -> PathBuf {
        self.data_root.join("enriched.db")
    }

    /// Where the acquire stage writes message batch files
    pub fn messages_root(&self) -> PathBuf {
        self.data_root.join("raw").join("telegram_messages")
    }

    /// Where image files referenced by raw rows live
    pub fn media_root(&self) -> PathBuf {
        self.data_root.join("raw").join("telegram_media")
    }
}

/// Read the TOML config file, if any.
///
/// An explicitly named file must exist and parse; the conventional location
/// is optional and falls back to defaults.
fn load_toml(explicit: Option<&Path>) -> Result<TomlConfig> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match env_path("TGPIPE_CONFIG") {
            Some(p) => (p, true),
            None => (default_config_path(), false),
        },
    };

    if !path.exists() {
        if required {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        warn!(
            "No config file at {}, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tgpipe").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("tgpipe.toml"))
}

fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tgpipe"))
        .unwrap_or_else(|| PathBuf::from("./tgpipe_data"))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}
