use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/resonance/config.toml` or `~/.config/resonance/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `RESONANCE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub analysis: AnalysisSettings,
    pub visual: VisualSettings,
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// How often the playback snapshot is persisted while playing (milliseconds).
    pub autosave_interval_ms: u64,
    /// Volume used when nothing was persisted yet (percent, 0-100).
    pub default_volume: u8,
    /// Step used by the volume up/down keys (percent).
    pub volume_step: u8,
    /// Shuffle freshly loaded track lists.
    pub shuffle_on_load: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            autosave_interval_ms: 50,
            default_volume: 100,
            volume_step: 5,
            shuffle_on_load: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// FFT window length; must be a power of two.
    pub fft_size: usize,
    /// Temporal smoothing between successive spectra, in `[0, 1)`.
    pub smoothing: f32,
    /// Magnitude (dB) mapped to byte value 0.
    pub min_decibels: f32,
    /// Magnitude (dB) mapped to byte value 255.
    pub max_decibels: f32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    /// Draw the animated background at all.
    pub enabled: bool,
    /// Delay before retrying the analysis tap when it was not ready at start.
    pub reconnect_delay_ms: u64,
    /// Target frame period of the animation loop.
    pub frame_interval_ms: u64,
    /// Blur radius in reference pixels.
    pub blur_radius: f32,
    /// Width of the surface the point sizes and blur radius are tuned for.
    pub reference_width: f32,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect_delay_ms: 100,
            frame_interval_ms: 16,
            blur_radius: 60.0,
            reference_width: 1200.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// API version marker sent with every call.
    pub version: String,
    pub user_agent: String,
    /// Number of tracks requested per list call.
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.vk.com/method".to_string(),
            version: "5.131".to_string(),
            user_agent: "KateMobileAndroid/99 lite-999 (Android 13; SDK 33; arm64-v8a; VK; ru)"
                .to_string(),
            page_size: 100,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the persisted playback state and the log file.
    /// Defaults to `$XDG_STATE_HOME/resonance` or `~/.local/state/resonance`.
    pub state_dir: Option<PathBuf>,
    /// Token file. Defaults to `<config dir>/resonance/.env`.
    pub credentials_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " resonance ".to_string(),
            scrub_seconds: 5,
        }
    }
}
