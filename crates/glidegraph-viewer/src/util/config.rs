use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::anim::scheduler::{
    TransitionParams, DEFAULT_BATCH_FRACTION, DEFAULT_STEP_FRACTION, DEFAULT_TOLERANCE_RATIO,
};
use crate::net::PollSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AgentEndpointKind {
    UdsPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEndpoint {
    pub name: String,
    pub kind: AgentEndpointKind,
}

impl Default for AgentEndpoint {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            kind: AgentEndpointKind::UdsPath(default_uds_path()),
        }
    }
}

impl AgentEndpoint {
    pub fn sock_path(&self) -> &str {
        match &self.kind {
            AgentEndpointKind::UdsPath(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub tick_interval_ms: u64,
    pub step_fraction: f64,
    pub batch_fraction: f64,
    /// Tolerance as a share of `step_fraction`; must stay below 1.
    pub tolerance_ratio: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            step_fraction: DEFAULT_STEP_FRACTION,
            batch_fraction: DEFAULT_BATCH_FRACTION,
            tolerance_ratio: DEFAULT_TOLERANCE_RATIO,
        }
    }
}

impl AnimationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn transition_params(&self) -> anyhow::Result<TransitionParams> {
        TransitionParams::with_ratio(self.step_fraction, self.batch_fraction, self.tolerance_ratio)
            .context("invalid [animation] settings")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    pub pump_max: usize,
    pub stats_interval_ms: u64,
    pub agent: AgentEndpoint,
    pub animation: AnimationConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            fetch_timeout_ms: 4000,
            pump_max: 100_000,
            stats_interval_ms: 30_000,
            agent: AgentEndpoint::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms.max(1))
    }

    /// Checks everything that would otherwise fail later at startup.
    pub fn validate(&self) -> anyhow::Result<TransitionParams> {
        if self.agent.sock_path().trim().is_empty() {
            anyhow::bail!("agent socket path is empty");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be non-zero");
        }
        if self.animation.tick_interval_ms == 0 {
            anyhow::bail!("animation.tick_interval_ms must be non-zero");
        }
        self.animation.transition_params()
    }
}

fn default_uds_path() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| {
            if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
                format!("{dir}/glidegraph.sock")
            } else {
                "/tmp/glidegraph.sock".to_string()
            }
        })
        .clone()
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "glidegraph")?;
    Some(proj.config_dir().join("viewer.toml"))
}

/// Loads the config file, writing the defaults out first if none exists yet.
pub fn load_or_init() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    if !path.exists() {
        let cfg = ViewerConfig::default();
        if let Err(e) = save_to_path(&cfg, &path) {
            tracing::warn!(error = %format!("{e:#}"), "could not write default viewer config");
        } else {
            tracing::info!(path = %path.display(), "wrote default viewer config");
        }
        return cfg;
    }
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable viewer config");
        ViewerConfig::default()
    })
}

fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}
