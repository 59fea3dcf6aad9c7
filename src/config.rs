use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::animation::{AnimationSettings, WrapPolicy};
use crate::core::orchestrator::{SweepPlan, DEFAULT_PACING};
use crate::core::remote::{DEFAULT_ENDPOINT, DEFAULT_QUBITS};

pub fn default_config_path() -> Option<PathBuf> {
    // ~/.qkd-sweep/config.toml
    dirs_next::home_dir().map(|h| h.join(".qkd-sweep").join("config.toml"))
}

pub fn resolve_config_path(cli_path: &Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = cli_path {
        return Some(p.clone());
    }
    default_config_path()
}

/// Settings file. Every field is optional in TOML; missing ones take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub endpoint: String,
    pub request_timeout_ms: u64,
    pub pacing_ms: u64,
    pub qubits: u32,
    pub distances: Vec<f64>,
    pub frame_interval_ms: u64,
    pub particle_count: usize,
    pub speed: f64,
    pub wrap_policy: WrapPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_ms: 30_000,
            pacing_ms: DEFAULT_PACING.as_millis() as u64,
            qubits: DEFAULT_QUBITS,
            distances: SweepPlan::default_distances(),
            frame_interval_ms: 16,
            particle_count: 15,
            speed: 1.0,
            wrap_policy: WrapPolicy::Retain,
        }
    }
}

impl SweepConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: SweepConfig = toml::from_str(&txt)
            .with_context(|| format!("parsing {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_toml_file(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            bail!("endpoint must not be empty");
        }
        if self.qubits == 0 {
            bail!("qubits must be greater than 0");
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            bail!("speed must be a positive number, got {}", self.speed);
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than 0");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }
    pub fn pacing(&self) -> Duration { Duration::from_millis(self.pacing_ms) }
    pub fn frame_interval(&self) -> Duration { Duration::from_millis(self.frame_interval_ms) }

    pub fn animation_settings(&self) -> AnimationSettings {
        AnimationSettings {
            particle_count: self.particle_count,
            speed_multiplier: self.speed,
            wrap_policy: self.wrap_policy,
            ..AnimationSettings::default()
        }
    }
}
