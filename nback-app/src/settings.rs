use std::{fs, path::Path};

use anyhow::{Context, Result};
use nback_engine::{PacingMode, RoundMode, SessionConfig};
use tracing::{debug, warn};

/// Read when no `--config` is given, if present.
pub const DEFAULT_SETTINGS_FILE: &str = "nback.toml";

/// Builds the session config: defaults, then the TOML file, then `NBACK_*`
/// environment variables. CLI flags are applied by the caller.
pub fn load_settings(path: Option<&Path>) -> Result<SessionConfig> {
    let mut settings = match path {
        Some(path) => read_file(path)?,
        None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
            read_file(Path::new(DEFAULT_SETTINGS_FILE))?
        }
        None => SessionConfig::default(),
    };
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_file(path: &Path) -> Result<SessionConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let settings = toml::from_str::<SessionConfig>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    debug!(path = %path.display(), "loaded settings file");
    Ok(settings)
}

/// Applies environment overrides. Unparseable values are logged and skipped.
pub fn apply_env(settings: &mut SessionConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = parsed(&var, "NBACK_N") {
        settings.n = v;
    }
    if let Some(v) = parsed(&var, "NBACK_ROUNDS") {
        settings.rounds = RoundMode::Custom { count: v };
    }
    if let Some(v) = parsed(&var, "NBACK_INTERVAL_SECS") {
        settings.base_interval_secs = v;
    }
    if let Some(v) = parsed(&var, "NBACK_DISPLAY_SECS") {
        settings.display_secs = v;
    }
    if let Some(v) = parsed::<PacingMode>(&var, "NBACK_PACING") {
        settings.pacing = v;
    }
    if let Some(v) = parsed(&var, "NBACK_VARIABLE") {
        settings.variable_mode = v;
    }
    if let Some(v) = parsed(&var, "NBACK_CENTER_CELL") {
        settings.use_center_cell = v;
    }
    if let Some(v) = parsed(&var, "NBACK_FEEDBACK") {
        settings.show_feedback = v;
    }

    if let Some(raw) = var("NBACK_WEIGHTS") {
        let weights: Result<Vec<u32>, _> = raw
            .split(',')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::parse)
            .collect();
        match weights {
            Ok(weights) => settings.variable_weights = weights,
            Err(error) => warn!(value = %raw, %error, "ignoring NBACK_WEIGHTS"),
        }
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, value = %raw, %error, "ignoring unparseable environment override");
            None
        }
    }
}
