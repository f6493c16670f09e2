use thiserror::Error;

use crate::client::code_source::PromptError;
use crate::client::oauth_client::OAuthClientError;
use crate::client::token_storage::StoreError;
use crate::common::AccessGrant;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Credential store error: {0}")]
    Store(#[source] StoreError),

    #[error("Authorization prompt failed: {0}")]
    Prompt(#[from] PromptError),

    #[error("Authorization code exchange failed: {0}")]
    AuthExchange(#[source] OAuthClientError),

    #[error("Token refresh failed: {0}")]
    Refresh(#[source] OAuthClientError),

    /// The network exchange succeeded but the new tokens could not be saved.
    /// `grant` is still valid for the current process.
    #[error("Failed to persist credentials: {source}")]
    Persistence {
        #[source]
        source: StoreError,
        grant: Box<AccessGrant>,
    },
}

impl AuthError {
    /// Token obtained before a persistence failure, usable for this run only.
    pub fn unpersisted_grant(&self) -> Option<&AccessGrant> {
        match self {
            AuthError::Persistence { grant, .. } => Some(grant),
            _ => None,
        }
    }

    pub fn into_unpersisted_grant(self) -> Result<AccessGrant, Self> {
        match self {
            AuthError::Persistence { grant, .. } => Ok(*grant),
            other => Err(other),
        }
    }
}
