use serde::Deserialize;
use std::path::{Path, PathBuf};
use stravasync_auth::AuthSettings;

use crate::error::SyncError;

pub const ENV_PREFIX: &str = "STRAVASYNC";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Activities requested per page, at most 200
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportSettings {
    #[serde(default = "default_export_path")]
    pub path: PathBuf,

    /// Activity types kept in the export, compared case-insensitively
    #[serde(default = "default_activity_types")]
    pub activity_types: Vec<String>,
}

fn default_base_url() -> String {
    strava_api::BASE_URL.to_string()
}

fn default_per_page() -> u32 {
    strava_api::endpoints::MAX_PAGE_SIZE
}

fn default_export_path() -> PathBuf {
    PathBuf::from("data/running_activities_header.csv")
}

fn default_activity_types() -> Vec<String> {
    vec!["Run".to_string()]
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            per_page: default_per_page(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            activity_types: default_activity_types(),
        }
    }
}

impl Settings {
    /// Layer `config.toml` (or the given file) under `STRAVASYNC__*`
    /// environment variables, e.g. `STRAVASYNC__AUTH__ENV_FILE`.
    pub fn load(config_file: Option<&Path>) -> Result<Self, SyncError> {
        let mut builder = config::Config::builder();

        match config_file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if Path::new("config.toml").exists() {
                    builder = builder.add_source(config::File::with_name("config"));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("export.activity_types"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        self.auth.validate().map_err(SyncError::Configuration)?;

        if !self.api.base_url.starts_with("http") {
            return Err(SyncError::Configuration(
                "api.base_url must be a valid HTTP(S) URL".to_string(),
            ));
        }
        if self.api.per_page == 0 || self.api.per_page > strava_api::endpoints::MAX_PAGE_SIZE {
            return Err(SyncError::Configuration(format!(
                "api.per_page must be between 1 and {}",
                strava_api::endpoints::MAX_PAGE_SIZE
            )));
        }
        if self.export.path.as_os_str().is_empty() {
            return Err(SyncError::Configuration(
                "export.path is required".to_string(),
            ));
        }
        if self.export.activity_types.is_empty() {
            return Err(SyncError::Configuration(
                "export.activity_types cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
