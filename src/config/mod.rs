use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub cleaners: CleanersConfig,
    pub logs: LogsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub log_capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanersConfig {
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsConfig {
    pub enabled: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                log_capacity: DEFAULT_LOG_CAPACITY,
            },
            cleaners: CleanersConfig { exclude: vec![] },
            logs: LogsConfig { enabled: true },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    cleaners: Option<RawCleanersConfig>,
    logs: Option<RawLogsConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUiConfig {
    color: Option<bool>,
    log_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCleanersConfig {
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogsConfig {
    enabled: Option<bool>,
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/broom/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(log_capacity) = ui.log_capacity {
            cfg.ui.log_capacity = log_capacity;
        }
    }

    if let Some(exclude) = raw.cleaners.and_then(|c| c.exclude) {
        cfg.cleaners.exclude = exclude;
    }

    if let Some(enabled) = raw.logs.and_then(|l| l.enabled) {
        cfg.logs.enabled = enabled;
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("BROOM_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).context("BROOM_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("BROOM_UI_LOG_CAPACITY") {
        cfg.ui.log_capacity = v
            .trim()
            .parse::<usize>()
            .context("BROOM_UI_LOG_CAPACITY")?;
    }
    if let Ok(v) = std::env::var("BROOM_CLEANERS_EXCLUDE") {
        let parts: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if !parts.is_empty() {
            cfg.cleaners.exclude = parts;
        }
    }
    if let Ok(v) = std::env::var("BROOM_LOGS_ENABLED") {
        cfg.logs.enabled = parse_bool(&v).context("BROOM_LOGS_ENABLED")?;
    }

    Ok(())
}

fn validate(cfg: &EffectiveConfig) -> Result<()> {
    if cfg.ui.log_capacity == 0 {
        anyhow::bail!("ui.log_capacity must be at least 1");
    }
    crate::registry::exclude_set(&cfg.cleaners.exclude)?;
    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
