use anyhow::{Context, Result};
use chrono::Duration;
use secrecy::SecretString;
use std::time::Duration as StdDuration;
use stravasync_auth::{
    AccessGrant, AuthError, AuthorizationCodeSource, CodeReceiver, ConsolePrompt, CredentialRecord,
    EnvFileStore, StravaOAuthClient, TokenManager,
};

use crate::export::write_activities_csv;
use crate::settings::Settings;
use crate::sync::{authenticated_athlete, fetch_activities};

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub exported: usize,
    pub grant: AccessGrant,
}

pub struct App {
    settings: Settings,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Ensure a valid token, fetch the activities and write the CSV.
    ///
    /// When fresh tokens could not be saved the export still happens with
    /// the in-memory token, and the save failure is returned afterwards.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("stravasync starting");

        let (grant, unsaved) = match self.ensure_credential().await {
            Ok(grant) => (grant, None),
            Err(err) => match err.unpersisted_grant().cloned() {
                Some(grant) => {
                    tracing::warn!("Continuing with tokens that were not saved");
                    (grant, Some(err))
                }
                None => return Err(err).context("Could not obtain a Strava access token"),
            },
        };
        tracing::info!(source = ?grant.source, expires_at = %grant.expires_at, "Access token ready");

        let client =
            strava_api::Client::with_base_url(&self.settings.api.base_url, &grant.access_token);
        authenticated_athlete(&client).await?;

        let activities = fetch_activities(
            &client,
            self.settings.api.per_page,
            &self.settings.export.activity_types,
        )
        .await?;
        write_activities_csv(&activities, &self.settings.export.path)?;

        println!(
            "{} activities saved to {}",
            activities.len(),
            self.settings.export.path.display()
        );

        if let Some(err) = unsaved {
            return Err(err).context(format!(
                "Export finished, but the new tokens were not written to {}",
                self.settings.auth.env_file.display()
            ));
        }

        Ok(RunReport {
            exported: activities.len(),
            grant,
        })
    }

    async fn ensure_credential(&self) -> Result<AccessGrant, AuthError> {
        let auth = &self.settings.auth;
        let store = EnvFileStore::with_prefix(&auth.env_file, &auth.key_prefix);

        let record = CredentialRecord::load(&store).map_err(AuthError::Store)?;
        let (client_id, client_secret) = client_credentials(record, &auth.key_prefix)?;
        let endpoint = StravaOAuthClient::new(client_id, client_secret, auth)
            .map_err(|e| AuthError::Configuration(e.to_string()))?;

        let margin = Duration::try_seconds(auth.expiry_margin_secs).ok_or_else(|| {
            AuthError::Configuration("auth.expiry_margin_secs is out of range".to_string())
        })?;
        match auth.code_receiver {
            CodeReceiver::Console => {
                ensure_with(endpoint, store, ConsolePrompt::new(auth.open_browser), margin).await
            }
            CodeReceiver::Loopback => {
                let receiver = stravasync_auth::LoopbackReceiver::new(
                    StdDuration::from_secs(auth.callback_timeout_secs),
                    auth.open_browser,
                );
                ensure_with(endpoint, store, receiver, margin).await
            }
        }
    }
}

async fn ensure_with<P: AuthorizationCodeSource>(
    endpoint: StravaOAuthClient,
    store: EnvFileStore,
    code_source: P,
    margin: Duration,
) -> Result<AccessGrant, AuthError> {
    TokenManager::new(endpoint, store, code_source)
        .with_expiry_margin(margin)
        .ensure_valid_credential()
        .await
}

fn client_credentials(
    record: CredentialRecord,
    prefix: &str,
) -> Result<(String, SecretString), AuthError> {
    let missing = |key: &str| {
        AuthError::Configuration(format!(
            "{}{} is not set; add it to the env file or the environment",
            prefix, key
        ))
    };
    let client_id = record.client_id.ok_or_else(|| missing("CLIENT_ID"))?;
    let client_secret = record.client_secret.ok_or_else(|| missing("CLIENT_SECRET"))?;
    Ok((client_id, client_secret))
}
