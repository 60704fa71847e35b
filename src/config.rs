//! Runtime configuration.
//!
//! Settings come from an optional YAML file (`--config` / `NEWSFLOW_CONFIG`). Every
//! field has a default, so a partial file or no file at all is valid.
//!
//! ```yaml
//! database_path: /var/lib/newsflow/news.db
//! output_dir: /var/www/newsflow
//! translate: true
//! target_language: pt
//! translation_cache_path: /var/lib/newsflow/translations.json
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

use crate::dates::offset_hours;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Directory receiving the generated HTML reports.
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Pause before each Global Times article-page fetch.
    pub detail_fetch_delay_ms: u64,
    /// Trailing window for the daily report.
    pub window_hours: u32,
    pub translate: bool,
    pub target_language: String,
    /// Pause after each external translation call.
    pub translation_delay_ms: u64,
    /// Extra pause after every fifth external translation call.
    pub translation_pause_ms: u64,
    /// When set, translations are loaded from and saved to this JSON file.
    pub translation_cache_path: Option<PathBuf>,
    /// Timezone used for every time shown in the reports (Brasília by default).
    pub display_utc_offset_hours: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("news.db"),
            output_dir: PathBuf::from("."),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 15,
            detail_fetch_delay_ms: 400,
            window_hours: 24,
            translate: true,
            target_language: "pt".to_string(),
            translation_delay_ms: 200,
            translation_pause_ms: 500,
            translation_cache_path: None,
            display_utc_offset_hours: -3,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                info!("No config file given; using defaults");
                Ok(Self::default())
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn detail_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.detail_fetch_delay_ms)
    }

    pub fn translation_delay(&self) -> Duration {
        Duration::from_millis(self.translation_delay_ms)
    }

    pub fn translation_pause(&self) -> Duration {
        Duration::from_millis(self.translation_pause_ms)
    }

    pub fn display_offset(&self) -> FixedOffset {
        offset_hours(self.display_utc_offset_hours)
    }
}
