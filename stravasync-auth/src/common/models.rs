use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

/// Token material returned by an authorization-code exchange or a refresh.
///
/// Providers disagree on what they send back: Strava returns an absolute
/// `expires_at`, plain RFC 6749 servers only `expires_in`, and a refresh
/// response may omit the refresh token when it does not rotate.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in: Option<Duration>,
}

/// Where the access token handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Stored token, still valid. No network call was made.
    Cached,
    Refreshed,
    Authorized,
}

/// A usable access token.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub source: TokenSource,
}
