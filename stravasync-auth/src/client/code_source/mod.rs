mod console;
#[cfg(feature = "loopback")]
mod loopback;

pub use console::ConsolePrompt;
#[cfg(feature = "loopback")]
pub use loopback::LoopbackReceiver;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::client::oauth_client::AuthorizationUrl;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No authorization code was entered")]
    EmptyInput,

    #[error("Redirect did not contain an authorization code")]
    MissingCode,

    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("State parameter does not match the authorization request")]
    StateMismatch,

    #[error("Timed out after {0} seconds waiting for the authorization redirect")]
    Timeout(u64),

    #[error("Redirect listener failed: {0}")]
    Listener(String),
}

/// Obtains the single-use authorization code after the user consents.
#[async_trait]
pub trait AuthorizationCodeSource: Send + Sync {
    async fn obtain_authorization_code(
        &self,
        request: &AuthorizationUrl,
    ) -> Result<String, PromptError>;
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Default, serde::Deserialize)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub scope: Option<String>,
}

impl RedirectParams {
    fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "scope" => params.scope = value,
                _ => {}
            }
        }
        params
    }

    /// Validate the redirect against the request it answers.
    pub fn into_code(self, expected_state: &str) -> Result<String, PromptError> {
        if let Some(error) = self.error {
            return Err(PromptError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(PromptError::StateMismatch);
        }
        if let Some(scope) = &self.scope {
            tracing::debug!(scope = %scope, "Scopes granted");
        }
        self.code
            .filter(|code| !code.is_empty())
            .ok_or(PromptError::MissingCode)
    }
}

/// Accept either a bare code or the full redirect URL the browser landed on.
pub fn extract_code(input: &str, expected_state: &str) -> Result<String, PromptError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PromptError::EmptyInput);
    }

    match Url::parse(input) {
        Ok(url) if url.query().is_some() => RedirectParams::from_url(&url).into_code(expected_state),
        _ => Ok(input.to_string()),
    }
}
