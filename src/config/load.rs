use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then environment variables
/// (prefix `RESONANCE__`) on top of it, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("RESONANCE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let fft = self.analysis.fft_size;
        if !fft.is_power_of_two() || !(32..=32768).contains(&fft) {
            return Err("analysis.fft_size must be a power of two in 32..=32768".to_string());
        }
        if self.analysis.min_decibels >= self.analysis.max_decibels {
            return Err("analysis.min_decibels must be below analysis.max_decibels".to_string());
        }
        if !(0.0..1.0).contains(&self.analysis.smoothing) {
            return Err("analysis.smoothing must be in [0, 1)".to_string());
        }
        if self.playback.autosave_interval_ms == 0 {
            return Err("playback.autosave_interval_ms must be >= 1".to_string());
        }
        if self.playback.default_volume > 100 {
            return Err("playback.default_volume must be <= 100".to_string());
        }
        if self.visual.reference_width <= 0.0 {
            return Err("visual.reference_width must be positive".to_string());
        }
        Ok(())
    }

    /// Directory holding persisted state and the log file.
    pub fn state_dir(&self) -> Option<PathBuf> {
        self.storage.state_dir.clone().or_else(default_state_dir)
    }

    /// File holding the bearer token.
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.storage
            .credentials_path
            .clone()
            .or_else(|| config_home().map(|d| d.join("resonance").join(".env")))
    }
}

/// Resolve the config path from `RESONANCE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("RESONANCE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

fn config_home() -> Option<PathBuf> {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    }
}

/// Compute the default config path under `$XDG_CONFIG_HOME/resonance/config.toml`
/// or `~/.config/resonance/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    config_home().map(|d| d.join("resonance").join("config.toml"))
}

/// `$XDG_STATE_HOME/resonance`, or `~/.local/state/resonance`.
pub fn default_state_dir() -> Option<PathBuf> {
    let state_home = if let Some(xdg) = env::var_os("XDG_STATE_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
    };
    state_home.map(|d| d.join("resonance"))
}
