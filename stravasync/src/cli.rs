use clap::Parser;
use std::path::PathBuf;

use crate::settings::Settings;

/// Export your Strava runs to CSV, keeping the OAuth tokens fresh in a dotenv file
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Settings file (TOML); `./config.toml` is used when present
    #[arg(short, long, env = "STRAVASYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dotenv file holding the client credentials and tokens
    #[arg(short, long, env = "STRAVASYNC_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// CSV file to (over)write
    #[arg(short, long, env = "STRAVASYNC_OUTPUT")]
    pub output: Option<PathBuf>,
}

impl CliArgs {
    /// Load settings and apply the command line overrides on top.
    pub fn settings(&self) -> Result<Settings, crate::SyncError> {
        let mut settings = Settings::load(self.config.as_deref())?;
        self.apply(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(env_file) = &self.env_file {
            settings.auth.env_file = env_file.clone();
        }
        if let Some(output) = &self.output {
            settings.export.path = output.clone();
        }
    }
}
