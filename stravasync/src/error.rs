use std::path::PathBuf;
use strava_api::StravaApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch activities: {0}")]
    Fetch(#[from] StravaApiError),

    #[error("Failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl SyncError {
    pub(crate) fn export(path: impl Into<PathBuf>, source: impl Into<csv::Error>) -> Self {
        SyncError::Export {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}
