//! In-memory collaborators for exercising [`TokenManager`](crate::TokenManager)
//! without network, disk, or a terminal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

use crate::client::{
    AuthorizationCodeSource, AuthorizationUrl, Clock, CredentialKey, CredentialStore,
    OAuthClientError, PromptError, StoreError, TokenEndpoint,
};
use crate::common::TokenGrant;

pub fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).expect("timestamp in range")
}

/// Grant as Strava returns it: new access and refresh token plus absolute expiry.
pub fn grant(access_token: &str, refresh_token: &str, expires_at: i64) -> TokenGrant {
    TokenGrant {
        access_token: SecretString::from(access_token.to_string()),
        refresh_token: Some(SecretString::from(refresh_token.to_string())),
        expires_at: Some(at(expires_at)),
        expires_in: None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(seconds: i64) -> Self {
        Self(at(seconds))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Credential store kept in memory; writes can be made to fail.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<CredentialKey, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: CredentialKey, value: &str) -> Self {
        self.values.lock().unwrap().insert(key, value.to_string());
        self
    }

    pub fn value(&self, key: CredentialKey) -> Option<String> {
        self.values.lock().unwrap().get(&key).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set_all` batches.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.set_all(&[(key, value)])
    }

    fn set_all(&self, entries: &[(CredentialKey, &str)]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut values = self.values.lock().unwrap();
        for (key, value) in entries {
            values.insert(*key, value.to_string());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out a fixed authorization code and counts how often it was asked.
pub struct FixedCode {
    code: Option<String>,
    calls: AtomicUsize,
}

impl FixedCode {
    pub fn new(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A source that fails as if the user closed the prompt.
    pub fn unavailable() -> Self {
        Self {
            code: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationCodeSource for FixedCode {
    async fn obtain_authorization_code(
        &self,
        _request: &AuthorizationUrl,
    ) -> Result<String, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.code.clone().ok_or(PromptError::EmptyInput)
    }
}

/// Token endpoint that replays scripted responses and records every call.
#[derive(Default)]
pub struct ScriptedEndpoint {
    exchange_responses: Mutex<VecDeque<Result<TokenGrant, OAuthClientError>>>,
    refresh_responses: Mutex<VecDeque<Result<TokenGrant, OAuthClientError>>>,
    exchanged_codes: Mutex<Vec<String>>,
    refreshed_tokens: Mutex<Vec<String>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exchange(self, response: Result<TokenGrant, OAuthClientError>) -> Self {
        self.exchange_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn on_refresh(self, response: Result<TokenGrant, OAuthClientError>) -> Self {
        self.refresh_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanged_codes.lock().unwrap().clone()
    }

    pub fn refreshed_tokens(&self) -> Vec<String> {
        self.refreshed_tokens.lock().unwrap().clone()
    }

    pub fn network_calls(&self) -> usize {
        self.exchanged_codes.lock().unwrap().len() + self.refreshed_tokens.lock().unwrap().len()
    }
}

fn unscripted() -> Result<TokenGrant, OAuthClientError> {
    Err(OAuthClientError::MalformedResponse(
        "no scripted response".to_string(),
    ))
}

#[async_trait]
impl TokenEndpoint for ScriptedEndpoint {
    fn authorization_url(&self) -> AuthorizationUrl {
        AuthorizationUrl {
            url: Url::parse("https://www.strava.com/oauth/authorize?client_id=1&state=test")
                .expect("static url"),
            state: "test".to_string(),
            redirect_uri: Url::parse("http://127.0.0.1:5000/authorization").expect("static url"),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthClientError> {
        self.exchanged_codes.lock().unwrap().push(code.to_string());
        let response = self.exchange_responses.lock().unwrap().pop_front();
        response.unwrap_or_else(unscripted)
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, OAuthClientError> {
        self.refreshed_tokens
            .lock()
            .unwrap()
            .push(refresh_token.expose_secret().to_string());
        let response = self.refresh_responses.lock().unwrap().pop_front();
        response.unwrap_or_else(unscripted)
    }
}
