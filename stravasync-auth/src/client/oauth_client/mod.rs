mod models;

pub use models::{
    AuthorizationUrl, OAuthClientError, StravaErrorDetail, StravaErrorResponse, StravaTokenFields,
    StravaTokenResponse,
};

use async_trait::async_trait;
use chrono::DateTime;
use oauth2::basic::{BasicRevocationErrorResponse, BasicTokenIntrospectionResponse};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, HttpRequest, HttpResponse, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::client::config::AuthSettings;
use crate::common::TokenGrant;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// The authorization server: builds consent URLs and mints tokens.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    fn authorization_url(&self) -> AuthorizationUrl;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthClientError>;

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, OAuthClientError>;
}

// Simple async HTTP client for OAuth2
async fn http_client(request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    let mut builder = client
        .request(request.method().clone(), request.uri().to_string())
        .body(request.body().clone());

    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    let mut http_response = HttpResponse::new(body);
    *http_response.status_mut() = status;

    Ok(http_response)
}

type StravaClient = Client<
    StravaErrorResponse,
    StravaTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

pub struct StravaOAuthClient {
    client_id: String,
    client_secret: SecretString,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    scopes: Vec<String>,
}

impl StravaOAuthClient {
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        settings: &AuthSettings,
    ) -> Result<Self, OAuthClientError> {
        let auth_url = AuthUrl::new(settings.authorize_url.clone())
            .map_err(|e| OAuthClientError::Configuration(format!("Invalid auth URL: {}", e)))?;

        let token_url = TokenUrl::new(settings.token_url.clone())
            .map_err(|e| OAuthClientError::Configuration(format!("Invalid token URL: {}", e)))?;

        let redirect_url = RedirectUrl::new(settings.redirect_uri.clone()).map_err(|e| {
            OAuthClientError::Configuration(format!("Invalid redirect URI: {}", e))
        })?;

        Ok(Self {
            client_id,
            client_secret,
            auth_url,
            token_url,
            redirect_url,
            scopes: settings.scopes.clone(),
        })
    }

    fn client(&self) -> StravaClient {
        // Strava expects the client credentials in the form body, not in a
        // Basic authorization header.
        Client::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .set_auth_type(AuthType::RequestBody)
    }
}

fn into_grant(token: StravaTokenResponse) -> TokenGrant {
    TokenGrant {
        access_token: SecretString::from(token.access_token().secret().to_string()),
        refresh_token: token
            .refresh_token()
            .map(|t| SecretString::from(t.secret().to_string())),
        expires_at: token
            .extra_fields()
            .expires_at
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
        expires_in: token
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok()),
    }
}

#[async_trait]
impl TokenEndpoint for StravaOAuthClient {
    /// Build the consent URL with a random state parameter for CSRF protection
    fn authorization_url(&self) -> AuthorizationUrl {
        let client = self.client();
        let mut request = client.authorize_url(CsrfToken::new_random);
        if !self.scopes.is_empty() {
            // Strava wants a comma separated scope list
            request = request.add_scope(Scope::new(self.scopes.join(",")));
        }
        let (url, state) = request.add_extra_param("approval_prompt", "auto").url();

        AuthorizationUrl {
            url,
            state: state.secret().to_string(),
            redirect_uri: self.redirect_url.url().clone(),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthClientError> {
        let token_result = self
            .client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&http_client)
            .await?;

        tracing::debug!("Successfully exchanged code for tokens");

        Ok(into_grant(token_result))
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, OAuthClientError> {
        let token_result = self
            .client()
            .exchange_refresh_token(&RefreshToken::new(
                refresh_token.expose_secret().to_string(),
            ))
            .request_async(&http_client)
            .await?;

        tracing::debug!("Successfully refreshed tokens");

        Ok(into_grant(token_result))
    }
}
