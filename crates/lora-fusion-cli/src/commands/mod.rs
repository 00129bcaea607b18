//! CLI command handlers
//!
//! # Modules
//!
//! - `fuse`: Whole-engine request
//! - `segment`: Perplexity-minima segmentation
//! - `route`: Single-clause routing
//! - `affinity`: Task-affinity embedding

pub mod affinity;
pub mod fuse;
pub mod route;
pub mod segment;

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context};
use tracing::debug;

use lora_fusion_core::{EngineConfig, StorageHandle};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output for programmatic parsing
    Json,
}

/// Expert given on the command line as `id:domain[:tag,tag...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertSpec {
    pub id: String,
    pub domain: String,
    pub tags: Vec<String>,
}

impl ExpertSpec {
    pub fn storage(&self) -> StorageHandle {
        StorageHandle::new(format!("mem://{}", self.id))
    }
}

impl FromStr for ExpertSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let id = parts.next().unwrap_or_default().trim();
        let domain = parts.next().unwrap_or_default().trim();
        if id.is_empty() || domain.is_empty() {
            return Err(format!("expected id:domain[:tags], got '{}'", s));
        }
        let tags = parts
            .next()
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            id: id.to_string(),
            domain: domain.to_string(),
            tags,
        })
    }
}

/// Experts used when none are given.
pub fn default_experts() -> Vec<ExpertSpec> {
    ["math-lora:math:arithmetic", "code-lora:code:rust,python", "creative-lora:creative:poem,story"]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Given experts, or the defaults if the list is empty.
pub fn experts_or_default(experts: Vec<ExpertSpec>) -> Vec<ExpertSpec> {
    if experts.is_empty() {
        default_experts()
    } else {
        experts
    }
}

/// Load the engine configuration, then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate().context("validating configuration")?;
    debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Positional text, or stdin when absent or `-`.
pub fn read_text(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request text from stdin")?;
            if buf.trim().is_empty() {
                bail!("no input text given");
            }
            Ok(buf.trim_end().to_string())
        }
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", json);
    Ok(())
}
