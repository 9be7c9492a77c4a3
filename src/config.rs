use crate::error::PipelineError;
use crate::models::{CategoryMode, ModeKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Root of the vital articles hierarchy, relative to the wiki host
pub const LISTING_PATH: &str = "/wiki/Wikipedia:Vital_articles";

/// Subpage that only tallies article counts; never a content page
pub const RUNNING_TOTAL_SENTINEL: &str = "Current_total";

/// Classes of the `<div>` holding a rendered page body
pub const CONTENT_REGION_CLASSES: [&str; 2] = ["mw-content-ltr", "mw-parser-output"];

/// Levels at or below this are single pages laid out as tables
pub const TABLE_LAYOUT_MAX_LEVEL: u32 = 3;

/// Template spans containing any of these (lowercased) are dropped
pub const TEMPLATE_TRIGGER_WORDS: [&str; 4] = ["cite", "sfn", "citation needed", "redirect"];

/// Suffix of the per-mode title set artifact (`<mode>_articles.txt`)
pub const TITLE_SET_SUFFIX: &str = "_articles.txt";

/// Extension of per-article output artifacts
pub const OUTPUT_EXTENSION: &str = "txt";

/// Per-request timeout for listing fetches (seconds)
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Identifies the crate and version to the wiki host
pub const USER_AGENT: &str = concat!("vitalwiki/", env!("CARGO_PKG_VERSION"));

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Wiki host used when `base_url` is not configured
pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org";

/// Pause between subpage fetches when `request_delay_ms` is not configured
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Progress update interval (report every N dump pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Run configuration, loaded once at startup and passed down explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general_level: u32,
    #[serde(default)]
    pub special_level: Option<u32>,
    #[serde(default)]
    pub special_level_topics: Option<Vec<String>>,
    pub data_filename: PathBuf,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_process_dir")]
    pub process_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_process_dir() -> PathBuf {
    PathBuf::from("process")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_request_delay_ms() -> u64 {
    DEFAULT_REQUEST_DELAY_MS
}

fn default_progress_interval() -> u64 {
    PROGRESS_INTERVAL
}

impl Config {
    /// Reads, parses and validates the config file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&raw)?;
        info!(path = %path.display(), modes = config.modes().len(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        let config: Config = serde_json::from_str(raw)
            .map_err(|e| PipelineError::Configuration(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the level ordering and allow-list invariants. Must pass before
    /// any network or dump I/O happens.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.general_level == 0 {
            return Err(PipelineError::Configuration(
                "`general_level` must be at least 1".to_string(),
            ));
        }

        if let Some(special) = self.special_level {
            if special <= self.general_level {
                return Err(PipelineError::Configuration(format!(
                    "`special_level` ({}) must be greater than `general_level` ({})",
                    special, self.general_level
                )));
            }
            match &self.special_level_topics {
                Some(topics) if !topics.is_empty() => {}
                _ => {
                    return Err(PipelineError::Configuration(
                        "`special_level_topics` must be a non-empty list when `special_level` is set"
                            .to_string(),
                    ))
                }
            }
        }

        if self.progress_interval == 0 {
            return Err(PipelineError::Configuration(
                "`progress_interval` must be at least 1".to_string(),
            ));
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            PipelineError::Configuration(format!("invalid `base_url` {}: {}", self.base_url, e))
        })?;

        Ok(())
    }

    /// Enabled category modes, general first.
    pub fn modes(&self) -> Vec<CategoryMode> {
        let mut modes = vec![CategoryMode::general(self.general_level)];
        if let Some(level) = self.special_level {
            modes.push(CategoryMode::new(
                ModeKind::Special,
                level,
                self.special_level_topics.clone(),
            ));
        }
        modes
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn mode_output_dir(&self, mode: &CategoryMode) -> PathBuf {
        self.output_dir.join(mode.name())
    }
}
