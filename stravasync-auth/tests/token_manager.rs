use chrono::Duration;
use secrecy::ExposeSecret;
use stravasync_auth::testing::{at, grant, FixedClock, FixedCode, MemoryStore, ScriptedEndpoint};
use stravasync_auth::oauth_client::StravaErrorResponse;
use stravasync_auth::{AuthError, CredentialKey, OAuthClientError, TokenManager, TokenSource};

type TestManager = TokenManager<ScriptedEndpoint, MemoryStore, FixedCode, FixedClock>;

fn manager(endpoint: ScriptedEndpoint, store: MemoryStore, now: i64) -> TestManager {
    TokenManager::new(endpoint, store, FixedCode::new("auth-code-1"))
        .with_clock(FixedClock::at(now))
}

fn revoked() -> OAuthClientError {
    OAuthClientError::Rejected(StravaErrorResponse {
        message: Some("Bad Request".to_string()),
        ..StravaErrorResponse::default()
    })
}

#[tokio::test]
async fn empty_record_runs_interactive_authorization() {
    let endpoint = ScriptedEndpoint::new().on_exchange(Ok(grant("a1", "r1", 21_800)));
    let manager = manager(endpoint, MemoryStore::new(), 200);

    let access = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(access.source, TokenSource::Authorized);
    assert_eq!(access.access_token.expose_secret(), "a1");
    assert_eq!(manager.endpoint().exchanged_codes(), ["auth-code-1"]);
    assert!(manager.endpoint().refreshed_tokens().is_empty());

    let store = manager.store();
    assert_eq!(store.value(CredentialKey::AccessToken).as_deref(), Some("a1"));
    assert_eq!(store.value(CredentialKey::RefreshToken).as_deref(), Some("r1"));
    assert_eq!(store.value(CredentialKey::ExpiresAt).as_deref(), Some("21800"));
    assert_eq!(store.value(CredentialKey::AuthCode).as_deref(), Some("auth-code-1"));
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn valid_token_is_reused_without_network() {
    let store = MemoryStore::new()
        .with(CredentialKey::AccessToken, "a1")
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "500");
    let manager = manager(ScriptedEndpoint::new(), store, 200);

    let access = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(access.source, TokenSource::Cached);
    assert_eq!(access.access_token.expose_secret(), "a1");
    assert_eq!(access.expires_at, at(500));
    assert_eq!(manager.endpoint().network_calls(), 0);
    assert_eq!(manager.store().write_count(), 0);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_rotation_persisted() {
    let store = MemoryStore::new()
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "100");
    let endpoint = ScriptedEndpoint::new().on_refresh(Ok(grant("a2", "r2", 300)));
    let manager = manager(endpoint, store, 200);

    let access = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(access.source, TokenSource::Refreshed);
    assert_eq!(access.access_token.expose_secret(), "a2");
    assert_eq!(manager.endpoint().refreshed_tokens(), ["r1"]);
    assert!(manager.endpoint().exchanged_codes().is_empty());

    let store = manager.store();
    assert_eq!(store.value(CredentialKey::AccessToken).as_deref(), Some("a2"));
    assert_eq!(store.value(CredentialKey::RefreshToken).as_deref(), Some("r2"));
    assert_eq!(store.value(CredentialKey::ExpiresAt).as_deref(), Some("300"));
    assert_eq!(store.value(CredentialKey::AuthCode), None);
}

#[tokio::test]
async fn token_expiring_exactly_now_is_refreshed() {
    let store = MemoryStore::new()
        .with(CredentialKey::AccessToken, "a1")
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "200");
    let endpoint = ScriptedEndpoint::new().on_refresh(Ok(grant("a2", "r1", 21_800)));
    let manager = manager(endpoint, store, 200);

    let access = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(access.access_token.expose_secret(), "a2");
    assert_eq!(manager.endpoint().refreshed_tokens(), ["r1"]);
    assert_eq!(
        manager.store().value(CredentialKey::RefreshToken).as_deref(),
        Some("r1")
    );
}

#[tokio::test]
async fn second_call_after_refresh_needs_no_network() {
    let store = MemoryStore::new()
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "100");
    let endpoint = ScriptedEndpoint::new().on_refresh(Ok(grant("a2", "r2", 300)));
    let manager = manager(endpoint, store, 200);

    manager.ensure_valid_credential().await.unwrap();
    let again = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(again.source, TokenSource::Cached);
    assert_eq!(again.access_token.expose_secret(), "a2");
    assert_eq!(manager.endpoint().network_calls(), 1);
}

#[tokio::test]
async fn refresh_returning_expired_token_is_not_used_or_saved() {
    let store = MemoryStore::new()
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "100");
    let endpoint = ScriptedEndpoint::new().on_refresh(Ok(grant("a2", "r2", 150)));
    let manager = manager(endpoint, store, 200);

    let err = manager.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::Refresh(OAuthClientError::MalformedResponse(_))
    ));
    assert_eq!(manager.store().write_count(), 0);
    assert_eq!(manager.store().value(CredentialKey::AccessToken), None);
}

#[tokio::test]
async fn refresh_failure_surfaces_without_prompting() {
    let store = MemoryStore::new()
        .with(CredentialKey::AccessToken, "a1")
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "100");
    let endpoint = ScriptedEndpoint::new().on_refresh(Err(revoked()));
    let manager = manager(endpoint, store, 200);

    let err = manager.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::Refresh(OAuthClientError::Rejected(_))));
    assert!(manager.endpoint().exchanged_codes().is_empty());
    assert_eq!(manager.store().write_count(), 0);
    assert_eq!(
        manager.store().value(CredentialKey::RefreshToken).as_deref(),
        Some("r1")
    );
}

#[tokio::test]
async fn refresh_without_rotation_keeps_refresh_token() {
    let store = MemoryStore::new()
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "100");
    let mut refreshed = grant("a2", "unused", 0);
    refreshed.refresh_token = None;
    refreshed.expires_at = None;
    refreshed.expires_in = Some(Duration::seconds(3600));
    let manager = manager(ScriptedEndpoint::new().on_refresh(Ok(refreshed)), store, 200);

    let access = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(access.expires_at, at(3800));
    let store = manager.store();
    assert_eq!(store.value(CredentialKey::RefreshToken).as_deref(), Some("r1"));
    assert_eq!(store.value(CredentialKey::ExpiresAt).as_deref(), Some("3800"));
}

#[tokio::test]
async fn failed_exchange_persists_nothing() {
    let endpoint = ScriptedEndpoint::new().on_exchange(Err(revoked()));
    let manager = manager(endpoint, MemoryStore::new(), 200);

    let err = manager.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::AuthExchange(_)));
    assert_eq!(manager.store().write_count(), 0);
    assert_eq!(manager.store().value(CredentialKey::AuthCode), None);
}

#[tokio::test]
async fn prompt_failure_skips_the_exchange() {
    let manager = TokenManager::new(
        ScriptedEndpoint::new(),
        MemoryStore::new(),
        FixedCode::unavailable(),
    )
    .with_clock(FixedClock::at(200));

    let err = manager.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::Prompt(_)));
    assert_eq!(manager.endpoint().network_calls(), 0);
}

#[tokio::test]
async fn persistence_failure_still_hands_out_the_new_token() {
    let store = MemoryStore::new()
        .with(CredentialKey::AccessToken, "a1")
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "100");
    store.fail_writes(true);
    let endpoint = ScriptedEndpoint::new().on_refresh(Ok(grant("a2", "r2", 300)));
    let manager = manager(endpoint, store, 200);

    let err = manager.ensure_valid_credential().await.unwrap_err();

    let unsaved = err.unpersisted_grant().expect("grant travels with the error");
    assert_eq!(unsaved.access_token.expose_secret(), "a2");
    assert_eq!(unsaved.source, TokenSource::Refreshed);
    assert!(matches!(err, AuthError::Persistence { .. }));
    assert_eq!(
        manager.store().value(CredentialKey::AccessToken).as_deref(),
        Some("a1")
    );
}

#[tokio::test]
async fn expiry_margin_triggers_early_refresh() {
    let store = MemoryStore::new()
        .with(CredentialKey::AccessToken, "a1")
        .with(CredentialKey::RefreshToken, "r1")
        .with(CredentialKey::ExpiresAt, "500");
    let endpoint = ScriptedEndpoint::new().on_refresh(Ok(grant("a2", "r2", 22_000)));
    let manager = manager(endpoint, store, 200).with_expiry_margin(Duration::minutes(5));

    let access = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(access.source, TokenSource::Refreshed);
}
