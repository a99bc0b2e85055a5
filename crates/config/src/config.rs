//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Folder and history file locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Root of the tree watched for new videos
    #[serde(default = "default_input_folder")]
    pub input_folder: PathBuf,
    /// Root under which transcoded files are written
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    /// JSON document recording completed transcodes
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

fn default_input_folder() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("transcode_history.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_folder: default_input_folder(),
            output_folder: default_output_folder(),
            history_file: default_history_file(),
        }
    }
}

/// What happens around a successful transcode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscodeConfig {
    /// Remove the source file once its transcode is recorded (default false)
    #[serde(default)]
    pub delete_original: bool,
    /// Appended to the output file stem, before the extension
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_suffix() -> String {
    "_transcoded".to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            delete_original: false,
            suffix: default_suffix(),
        }
    }
}

/// Av1an invocation settings, passed through verbatim
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Av1anConfig {
    /// Encoder executable (name on PATH or full path)
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Av1an worker count (logical CPU count if None)
    #[serde(default)]
    pub workers: Option<u32>,
    /// Target quality handed to `--target-quality` (lower is better)
    #[serde(default = "default_target_quality")]
    pub target_quality: f32,
    /// AV1 encoder backend (aom, rav1e, svt-av1)
    #[serde(default = "default_encoder")]
    pub encoder: String,
}

fn default_binary() -> String {
    "av1an".to_string()
}

fn default_target_quality() -> f32 {
    30.0
}

fn default_encoder() -> String {
    "aom".to_string()
}

impl Default for Av1anConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            workers: None,
            target_quality: default_target_quality(),
            encoder: default_encoder(),
        }
    }
}

/// Directory watching settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchConfig {
    /// File name suffixes that qualify for transcoding (case-insensitive)
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    /// Poll interval for the polling watcher backend
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Size-stability window before encoding a new file (0 = disabled)
    #[serde(default)]
    pub stability_wait_secs: u64,
    /// Enqueue qualifying files already present when the daemon starts
    #[serde(default)]
    pub scan_on_startup: bool,
}

fn default_video_extensions() -> Vec<String> {
    [".mp4", ".mkv", ".avi", ".mov", ".wmv", ".flv"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_check_interval_secs() -> u64 {
    60
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            video_extensions: default_video_extensions(),
            check_interval_secs: default_check_interval_secs(),
            stability_wait_secs: 0,
            scan_on_startup: false,
        }
    }
}

/// Retry policy for failed encodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first failure
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    /// Delay between attempts
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    300
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
    #[serde(default)]
    pub av1an: Av1anConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing optional fields and sections fall back to their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - INPUT_FOLDER -> paths.input_folder
    /// - OUTPUT_FOLDER -> paths.output_folder
    /// - TRANSCODE_HISTORY -> paths.history_file
    /// - DELETE_ORIGINAL -> transcode.delete_original
    /// - TRANSCODE_SUFFIX -> transcode.suffix
    /// - AV1AN_BINARY -> av1an.binary
    /// - AV1AN_WORKERS -> av1an.workers
    /// - AV1AN_TARGET_QUALITY -> av1an.target_quality
    /// - AV1AN_ENCODER -> av1an.encoder
    /// - LOG_FORMAT -> logging.format
    /// - LOG_LEVEL -> logging.level
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("INPUT_FOLDER") {
            self.paths.input_folder = PathBuf::from(val);
        }
        if let Ok(val) = env::var("OUTPUT_FOLDER") {
            self.paths.output_folder = PathBuf::from(val);
        }
        if let Ok(val) = env::var("TRANSCODE_HISTORY") {
            self.paths.history_file = PathBuf::from(val);
        }

        if let Ok(val) = env::var("DELETE_ORIGINAL") {
            if let Some(flag) = parse_bool(&val) {
                self.transcode.delete_original = flag;
            }
        }
        if let Ok(val) = env::var("TRANSCODE_SUFFIX") {
            self.transcode.suffix = val;
        }

        if let Ok(val) = env::var("AV1AN_BINARY") {
            self.av1an.binary = val;
        }
        if let Ok(val) = env::var("AV1AN_WORKERS") {
            if let Ok(workers) = val.parse::<u32>() {
                self.av1an.workers = Some(workers);
            }
        }
        if let Ok(val) = env::var("AV1AN_TARGET_QUALITY") {
            if let Ok(quality) = val.parse::<f32>() {
                self.av1an.target_quality = quality;
            }
        }
        if let Ok(val) = env::var("AV1AN_ENCODER") {
            self.av1an.encoder = val;
        }

        if let Ok(val) = env::var("LOG_FORMAT") {
            if let Ok(format) = val.parse::<LogFormat>() {
                self.logging.format = format;
            }
        }
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the built-in defaults.
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = match Self::load_from_file(path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Config::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }
}
