// Common types shared by the token manager and its collaborators
pub mod common;

mod client;
mod error;

pub use client::{
    code_source, oauth_client, plan, token_storage, AuthSettings, AuthorizationCodeSource,
    AuthorizationUrl, Clock, CodeReceiver, ConsolePrompt, CredentialKey, CredentialRecord,
    CredentialStore, EnvFileStore, OAuthClientError, PromptError, StoreError, StravaOAuthClient,
    SystemClock, TokenAction, TokenEndpoint, TokenManager,
};
#[cfg(feature = "loopback")]
pub use client::LoopbackReceiver;
pub use common::{AccessGrant, TokenGrant, TokenSource};
pub use error::AuthError;

// Always expose testing module (integration tests need it)
pub mod testing;
