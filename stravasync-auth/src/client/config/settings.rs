use serde::Deserialize;
use std::path::PathBuf;

use crate::client::token_storage::DEFAULT_KEY_PREFIX;

pub const STRAVA_AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Strava access tokens live six hours; a margin beyond a day is a typo.
pub const MAX_EXPIRY_MARGIN_SECS: i64 = 24 * 60 * 60;

/// How the authorization code gets back to us after consent.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodeReceiver {
    /// The user pastes the code (or the whole redirect URL) into the terminal.
    #[default]
    Console,
    /// A one-shot HTTP listener on the redirect URI catches the callback.
    Loopback,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// Dotenv file holding the client credentials and tokens
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub code_receiver: CodeReceiver,

    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,

    /// Treat access tokens as expired this many seconds early
    #[serde(default)]
    pub expiry_margin_secs: i64,

    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:5000/authorization".to_string()
}

fn default_authorize_url() -> String {
    STRAVA_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    STRAVA_TOKEN_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![
        "read_all".to_string(),
        "profile:read_all".to_string(),
        "activity:read_all".to_string(),
    ]
}

fn default_callback_timeout() -> u64 {
    300
}

fn default_open_browser() -> bool {
    true
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
            key_prefix: default_key_prefix(),
            redirect_uri: default_redirect_uri(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            scopes: default_scopes(),
            code_receiver: CodeReceiver::default(),
            callback_timeout_secs: default_callback_timeout(),
            expiry_margin_secs: 0,
            open_browser: default_open_browser(),
        }
    }
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("auth.redirect_uri", &self.redirect_uri),
            ("auth.authorize_url", &self.authorize_url),
            ("auth.token_url", &self.token_url),
        ] {
            if value.is_empty() {
                return Err(format!("{} is required", name));
            }
            if !value.starts_with("http") {
                return Err(format!("{} must be a valid HTTP(S) URL", name));
            }
        }
        if self.env_file.as_os_str().is_empty() {
            return Err("auth.env_file is required".to_string());
        }
        if self.callback_timeout_secs == 0 {
            return Err("auth.callback_timeout_secs must be positive".to_string());
        }
        if !(0..=MAX_EXPIRY_MARGIN_SECS).contains(&self.expiry_margin_secs) {
            return Err(format!(
                "auth.expiry_margin_secs must be between 0 and {}",
                MAX_EXPIRY_MARGIN_SECS
            ));
        }
        Ok(())
    }
}
