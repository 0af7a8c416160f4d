use crate::youtube::constants::{AUTOSAVE_FILE, CONCURRENT_YTDLP_LIMIT, DEFAULT_SEARCH_LIMIT};
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tubeplay/config.toml` or
/// `~/.config/tubeplay/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TUBEPLAY__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub resolver: ResolverSettings,
    pub player: PlayerSettings,
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolver: ResolverSettings::default(),
            player: PlayerSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Name or path of the yt-dlp executable, located via `$PATH`.
    pub bin: String,
    /// Default number of search results per query.
    pub search_limit: usize,
    /// Maximum number of concurrent yt-dlp processes.
    pub concurrency: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            bin: "yt-dlp".to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            concurrency: CONCURRENT_YTDLP_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Name or path of the mpv executable, located via `$PATH`.
    pub bin: String,
    /// Whether playback defaults to audio only (no video window).
    pub audio_only: bool,
    /// Maximum video resolution used for downloads and streaming.
    pub resolution: Resolution,
    /// Override for the mpv JSON IPC socket path.
    pub ipc_socket: Option<PathBuf>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            bin: "mpv".to_string(),
            audio_only: true,
            resolution: Resolution::default(),
            ipc_socket: None,
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize, Default, PartialEq, Eq)]
pub enum Resolution {
    #[default]
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "480" | "480p" => Ok(Resolution::P480),
            "720" | "720p" => Ok(Resolution::P720),
            "1080" | "1080p" => Ok(Resolution::P1080),
            other => Err(format!("unknown resolution '{other}', expected 480p, 720p or 1080p")),
        }
    }
}

impl Resolution {
    pub fn max_height(self) -> u32 {
        match self {
            Resolution::P480 => 480,
            Resolution::P720 => 720,
            Resolution::P1080 => 1080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    /// Media cache directory. Defaults to the platform cache dir
    /// (`~/.cache/tubeplay` on Linux).
    pub cache_dir: Option<PathBuf>,
}

impl Settings {
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.cache_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "tubeplay")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("tubeplay"))
    }

    pub fn autosave_path(&self) -> PathBuf {
        self.cache_dir().join(AUTOSAVE_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.cache_dir().join("logs")
    }

    pub fn ipc_socket_path(&self) -> PathBuf {
        self.player
            .ipc_socket
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("tubeplay-mpv.sock"))
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.resolver.concurrency == 0 {
            return Err("resolver.concurrency must be >= 1".to_string());
        }
        if self.resolver.search_limit == 0 {
            return Err("resolver.search_limit must be >= 1".to_string());
        }
        Ok(())
    }
}
