use oauth2::basic::BasicTokenType;
use oauth2::{ErrorResponse, ExtraTokenFields, RequestTokenError, StandardTokenResponse};
use serde::{Deserialize, Serialize};
use url::Url;

/// Fields Strava adds to the standard token response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StravaTokenFields {
    /// Absolute expiry of the access token, in epoch seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl ExtraTokenFields for StravaTokenFields {}

pub type StravaTokenResponse = StandardTokenResponse<StravaTokenFields, BasicTokenType>;

/// Error body of the token endpoint.
///
/// Strava answers with `{"message": ..., "errors": [...]}` rather than the
/// RFC 6749 `error` / `error_description` pair, so both shapes are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StravaErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<StravaErrorDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StravaErrorDetail {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub code: String,
}

impl ErrorResponse for StravaErrorResponse {}

impl std::fmt::Display for StravaErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.error, &self.message) {
            (Some(error), _) => write!(f, "{}", error)?,
            (None, Some(message)) => write!(f, "{}", message)?,
            (None, None) => write!(f, "unspecified error")?,
        }
        if let Some(description) = &self.error_description {
            write!(f, ": {}", description)?;
        }
        for detail in &self.errors {
            write!(f, "; {}.{}: {}", detail.resource, detail.field, detail.code)?;
        }
        Ok(())
    }
}

/// Authorization URL to present to the user, with the CSRF state it carries.
#[derive(Debug, Clone)]
pub struct AuthorizationUrl {
    pub url: Url,
    pub state: String,
    pub redirect_uri: Url,
}

#[derive(Debug)]
pub enum OAuthClientError {
    /// The request never got a usable HTTP response.
    Transport(reqwest::Error),
    /// The provider answered with an error, e.g. a revoked refresh token or
    /// an already used authorization code.
    Rejected(StravaErrorResponse),
    MalformedResponse(String),
    Configuration(String),
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "HTTP error: {}", e),
            Self::Rejected(e) => write!(f, "Rejected by provider: {}", e),
            Self::MalformedResponse(msg) => write!(f, "Malformed token response: {}", msg),
            Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for OAuthClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

impl From<RequestTokenError<reqwest::Error, StravaErrorResponse>> for OAuthClientError {
    fn from(err: RequestTokenError<reqwest::Error, StravaErrorResponse>) -> Self {
        match err {
            RequestTokenError::ServerResponse(response) => Self::Rejected(response),
            RequestTokenError::Request(e) => Self::Transport(e),
            RequestTokenError::Parse(e, body) => Self::MalformedResponse(format!(
                "{} (body: {})",
                e,
                String::from_utf8_lossy(&body)
            )),
            RequestTokenError::Other(msg) => Self::MalformedResponse(msg),
        }
    }
}
