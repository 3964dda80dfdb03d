use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "expo_harvest";
const ENV_PREFIX: &str = "EXPO";

pub const DEFAULT_ENDPOINT: &str = "https://conxemar.net/Conxemar2022/en/Company/Companies_Read";

/// Run settings: compiled defaults, then `expo_harvest.toml` (or `--config`),
/// then `EXPO_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint_url: String,
    pub page_size: u32,
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Hard stop after this many pages. Unset means fetch until a short page.
    pub max_pages: Option<u32>,
    pub json_path: PathBuf,
    pub localized_xlsx_path: PathBuf,
    pub template_path: PathBuf,
    pub formatted_xlsx_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            page_size: 20,
            page_delay_ms: 1000,
            request_timeout_secs: 30,
            max_pages: None,
            json_path: PathBuf::from("conxemar_companies.json"),
            localized_xlsx_path: PathBuf::from("conxemar_companies.xlsx"),
            template_path: PathBuf::from("Ambiente 2025 Exhibitor 리스트.xlsx"),
            formatted_xlsx_path: PathBuf::from("conxemar_ambiente_format.xlsx"),
        }
    }
}

impl Settings {
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
