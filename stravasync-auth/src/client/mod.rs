mod clock;
pub mod code_source;
mod config;
pub mod oauth_client;
pub mod token_storage;

pub use clock::{Clock, SystemClock};
pub use code_source::{AuthorizationCodeSource, ConsolePrompt, PromptError};
#[cfg(feature = "loopback")]
pub use code_source::LoopbackReceiver;
pub use config::{AuthSettings, CodeReceiver};
pub use oauth_client::{AuthorizationUrl, OAuthClientError, StravaOAuthClient, TokenEndpoint};
pub use token_storage::{CredentialKey, CredentialRecord, CredentialStore, EnvFileStore, StoreError};

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::common::{AccessGrant, TokenGrant, TokenSource};
use crate::error::AuthError;

/// What `ensure_valid_credential` has to do for a given record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// No refresh token: full interactive authorization.
    Authorize,
    /// Refresh token present but the access token is unusable.
    Refresh,
    /// The stored access token is still valid.
    Reuse,
}

/// Decide how to obtain a valid access token. First match wins:
/// a missing refresh token forces authorization, an expired (or missing)
/// access token forces a refresh, anything else is reused.
pub fn plan(record: &CredentialRecord, now: DateTime<Utc>, expiry_margin: Duration) -> TokenAction {
    if record.refresh_token.is_none() {
        return TokenAction::Authorize;
    }

    // A margin that overflows the calendar leaves nothing valid
    let horizon = now.checked_add_signed(expiry_margin);
    match (&record.access_token, record.expires_at, horizon) {
        (Some(_), Some(expires_at), Some(horizon)) if horizon < expires_at => TokenAction::Reuse,
        _ => TokenAction::Refresh,
    }
}

/// Keeps the access token valid across process runs.
///
/// Generic over its collaborators so the decision logic can run against
/// in-memory fakes.
pub struct TokenManager<E, S, P, C = SystemClock> {
    endpoint: E,
    store: S,
    code_source: P,
    clock: C,
    expiry_margin: Duration,
}

impl<E, S, P> TokenManager<E, S, P, SystemClock>
where
    E: TokenEndpoint,
    S: CredentialStore,
    P: AuthorizationCodeSource,
{
    pub fn new(endpoint: E, store: S, code_source: P) -> Self {
        Self {
            endpoint,
            store,
            code_source,
            clock: SystemClock,
            expiry_margin: Duration::zero(),
        }
    }
}

impl<E, S, P, C> TokenManager<E, S, P, C>
where
    E: TokenEndpoint,
    S: CredentialStore,
    P: AuthorizationCodeSource,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> TokenManager<E, S, P, C2> {
        TokenManager {
            endpoint: self.endpoint,
            store: self.store,
            code_source: self.code_source,
            clock,
            expiry_margin: self.expiry_margin,
        }
    }

    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Make sure a non-expired access token is available, doing at most one
    /// token round trip (plus the consent step when no refresh token exists).
    ///
    /// A refresh failure is returned as is; it never falls back to
    /// interactive authorization.
    pub async fn ensure_valid_credential(&self) -> Result<AccessGrant, AuthError> {
        let record = CredentialRecord::load(&self.store).map_err(AuthError::Store)?;
        let now = self.clock.now();

        let action = plan(&record, now, self.expiry_margin);
        match (action, record.access_token.clone(), record.expires_at) {
            (TokenAction::Reuse, Some(access_token), Some(expires_at)) => {
                tracing::debug!(%expires_at, "Access token still valid");
                Ok(AccessGrant {
                    access_token,
                    expires_at,
                    source: TokenSource::Cached,
                })
            }
            (TokenAction::Authorize, _, _) => self.authorize(now).await,
            _ => self.refresh(record, now).await,
        }
    }

    async fn refresh(
        &self,
        record: CredentialRecord,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, AuthError> {
        let Some(current_refresh_token) = record.refresh_token else {
            return Err(AuthError::Configuration(
                "refresh requested without a refresh token".to_string(),
            ));
        };

        tracing::info!(expires_at = ?record.expires_at, "Access token expired, refreshing");
        let grant = self
            .endpoint
            .refresh(&current_refresh_token)
            .await
            .map_err(AuthError::Refresh)?;

        let tokens = resolve(grant, Some(current_refresh_token), now).map_err(AuthError::Refresh)?;
        tracing::info!(expires_at = %tokens.expires_at, "Token refreshed");

        self.persist(tokens, None, TokenSource::Refreshed)
    }

    async fn authorize(&self, now: DateTime<Utc>) -> Result<AccessGrant, AuthError> {
        tracing::info!("No refresh token stored, starting interactive authorization");

        let request = self.endpoint.authorization_url();
        let code = self.code_source.obtain_authorization_code(&request).await?;

        let grant = self
            .endpoint
            .exchange_code(&code)
            .await
            .map_err(AuthError::AuthExchange)?;

        let tokens = resolve(grant, None, now).map_err(AuthError::AuthExchange)?;
        tracing::info!(expires_at = %tokens.expires_at, "Authorization complete");

        self.persist(tokens, Some(code.as_str()), TokenSource::Authorized)
    }

    /// Save the new token state in a single write; the grant only becomes
    /// the caller's token once it is durable, or travels inside the error.
    fn persist(
        &self,
        tokens: ResolvedTokens,
        authorization_code: Option<&str>,
        origin: TokenSource,
    ) -> Result<AccessGrant, AuthError> {
        let expires_at = tokens.expires_at.timestamp().to_string();
        let mut entries = vec![
            (CredentialKey::AccessToken, tokens.access_token.expose_secret()),
            (CredentialKey::RefreshToken, tokens.refresh_token.expose_secret()),
            (CredentialKey::ExpiresAt, expires_at.as_str()),
        ];
        if let Some(code) = authorization_code {
            entries.push((CredentialKey::AuthCode, code));
        }

        let result = self.store.set_all(&entries);

        let grant = AccessGrant {
            access_token: tokens.access_token.clone(),
            expires_at: tokens.expires_at,
            source: origin,
        };

        match result {
            Ok(()) => Ok(grant),
            Err(source) => {
                tracing::error!(
                    error = %source,
                    "New tokens could not be saved; they are only valid for this run"
                );
                Err(AuthError::Persistence {
                    source,
                    grant: Box::new(grant),
                })
            }
        }
    }
}

struct ResolvedTokens {
    access_token: SecretString,
    refresh_token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Fill the gaps of a provider response: a refresh response without a
/// refresh token keeps the current one, and a relative `expires_in` is
/// anchored at `now`.
fn resolve(
    grant: TokenGrant,
    current_refresh_token: Option<SecretString>,
    now: DateTime<Utc>,
) -> Result<ResolvedTokens, OAuthClientError> {
    let refresh_token = grant
        .refresh_token
        .or(current_refresh_token)
        .ok_or_else(|| OAuthClientError::MalformedResponse("no refresh token in response".to_string()))?;

    let expires_at = grant
        .expires_at
        .or_else(|| {
            grant
                .expires_in
                .and_then(|expires_in| now.checked_add_signed(expires_in))
        })
        .ok_or_else(|| {
            OAuthClientError::MalformedResponse("no expiration time in response".to_string())
        })?;

    if expires_at <= now {
        return Err(OAuthClientError::MalformedResponse(format!(
            "access token already expired at {}",
            expires_at
        )));
    }

    if grant.access_token.expose_secret().is_empty() {
        return Err(OAuthClientError::MalformedResponse(
            "empty access token in response".to_string(),
        ));
    }

    Ok(ResolvedTokens {
        access_token: grant.access_token,
        refresh_token,
        expires_at,
    })
}
