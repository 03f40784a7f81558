//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\artwork-minder\config.toml
//! - macOS: ~/Library/Application Support/artwork-minder/config.toml
//! - Linux: ~/.config/artwork-minder/config.toml
//!
//! The config file is human-readable and editable. Settings are
//! loaded at startup; missing sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metadata API credentials
    pub credentials: Credentials,

    /// Artwork download preferences
    pub preferences: ArtworkPreferences,

    /// Cache sizing and location
    pub cache: CacheConfig,

    /// HTTP settings
    pub network: NetworkConfig,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Last.fm API key for album/artist info lookups
    pub lastfm_api_key: Option<String>,
}

/// User preferences that gate discretionary downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkPreferences {
    /// Only download over Wi-Fi
    pub only_on_wifi: bool,

    /// Look up missing album artwork online
    pub download_missing_artwork: bool,

    /// Look up missing artist images online
    pub download_missing_artist_images: bool,

    /// Try the metadata API before local media
    pub prefer_download_over_local: bool,

    /// Skip the largest image sizes when picking a download
    pub want_low_resolution_art: bool,
}

impl Default for ArtworkPreferences {
    fn default() -> Self {
        Self {
            only_on_wifi: true,
            download_missing_artwork: true,
            download_missing_artist_images: true,
            prefer_download_over_local: false,
            want_low_resolution_art: false,
        }
    }
}

/// Cache sizing and location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disk cache directory (None = OS cache directory)
    pub directory: Option<PathBuf>,

    /// Memory budget for thumbnails, in bytes of decoded pixels
    pub thumbnail_memory_bytes: usize,

    /// Memory budget for full-size images, in bytes of decoded pixels
    pub full_memory_bytes: usize,

    /// Disk tier ceiling in bytes (0 = unbounded)
    pub disk_max_bytes: u64,

    /// Longest edge of a thumbnail, in pixels
    pub thumbnail_size: u32,

    /// Longest edge of a full-size image, in pixels
    pub full_size: u32,

    /// Idle seconds before the write-behind worker exits
    pub write_behind_idle_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            thumbnail_memory_bytes: 8 * 1024 * 1024,
            full_memory_bytes: 32 * 1024 * 1024,
            disk_max_bytes: 256 * 1024 * 1024,
            thumbnail_size: 300,
            full_size: 1200,
            write_behind_idle_secs: 60,
        }
    }
}

impl CacheConfig {
    /// Resolved disk cache directory.
    pub fn disk_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("artwork-minder")
                .join("artwork")
        })
    }

    /// Write-behind idle timeout.
    pub fn write_behind_idle(&self) -> Duration {
        Duration::from_secs(self.write_behind_idle_secs.max(1))
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// User-Agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("ArtworkMinder/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 20,
        }
    }
}

impl NetworkConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("artwork-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file. Same fallbacks as [`load`].
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)?;
    Ok(path)
}

/// Save configuration to a specific file, atomically.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

impl Config {
    /// Set one value by its dotted `section.field` name.
    ///
    /// An empty value clears optional fields.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "credentials.lastfm_api_key" => {
                self.credentials.lastfm_api_key = optional(value).map(str::to_string);
            }
            "preferences.only_on_wifi" => self.preferences.only_on_wifi = parse(key, value)?,
            "preferences.download_missing_artwork" => {
                self.preferences.download_missing_artwork = parse(key, value)?;
            }
            "preferences.download_missing_artist_images" => {
                self.preferences.download_missing_artist_images = parse(key, value)?;
            }
            "preferences.prefer_download_over_local" => {
                self.preferences.prefer_download_over_local = parse(key, value)?;
            }
            "preferences.want_low_resolution_art" => {
                self.preferences.want_low_resolution_art = parse(key, value)?;
            }
            "cache.directory" => self.cache.directory = optional(value).map(PathBuf::from),
            "cache.thumbnail_memory_bytes" => self.cache.thumbnail_memory_bytes = parse(key, value)?,
            "cache.full_memory_bytes" => self.cache.full_memory_bytes = parse(key, value)?,
            "cache.disk_max_bytes" => self.cache.disk_max_bytes = parse(key, value)?,
            "cache.thumbnail_size" => self.cache.thumbnail_size = parse(key, value)?,
            "cache.full_size" => self.cache.full_size = parse(key, value)?,
            "cache.write_behind_idle_secs" => self.cache.write_behind_idle_secs = parse(key, value)?,
            "network.user_agent" => self.network.user_agent = value.to_string(),
            "network.request_timeout_secs" => self.network.request_timeout_secs = parse(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn optional(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

// ============================================================================
// Tests
// ============================================================================
