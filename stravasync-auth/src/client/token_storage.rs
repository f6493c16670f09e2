use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_KEY_PREFIX: &str = "STRAVA_";

/// Keys of the credential record as persisted in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    ClientId,
    ClientSecret,
    AuthCode,
    AccessToken,
    RefreshToken,
    ExpiresAt,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 6] = [
        CredentialKey::ClientId,
        CredentialKey::ClientSecret,
        CredentialKey::AuthCode,
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::ExpiresAt,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            CredentialKey::ClientId => "CLIENT_ID",
            CredentialKey::ClientSecret => "CLIENT_SECRET",
            CredentialKey::AuthCode => "AUTH_CODE",
            CredentialKey::AccessToken => "ACCESS_TOKEN",
            CredentialKey::RefreshToken => "REFRESH_TOKEN",
            CredentialKey::ExpiresAt => "EXPIRES_AT",
        }
    }

    /// Application identifiers are provided by the user and never written back.
    pub const fn is_static(self) -> bool {
        matches!(self, CredentialKey::ClientId | CredentialKey::ClientSecret)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value persistence for the credential record.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;

    /// Write several keys. Implementations backed by a single file should
    /// override this so the entries land in one write.
    fn set_all(&self, entries: &[(CredentialKey, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(*key, value)?;
        }
        Ok(())
    }
}

/// Credential store backed by a dotenv file.
pub struct EnvFileStore {
    path: PathBuf,
    prefix: String,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_prefix(path, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, key: CredentialKey) -> String {
        format!("{}{}", self.prefix, key.name())
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let parse_err = |source| StoreError::Parse {
            path: self.path.clone(),
            source,
        };

        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(&self.path).map_err(parse_err)? {
            let (key, value) = item.map_err(parse_err)?;
            values.insert(key, value);
        }
        Ok(values)
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| ".env".into());
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, contents).map_err(|e| self.io_err(e))?;

        // Set permissions to 0600 (read/write for owner only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_err(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_err(e))
    }
}

impl CredentialStore for EnvFileStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let variable = self.variable(key);
        if let Some(value) = self.load()?.remove(&variable) {
            return Ok(Some(value));
        }

        // Client credentials may also be exported in the environment
        if key.is_static() {
            return Ok(std::env::var(&variable).ok());
        }

        Ok(None)
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.set_all(&[(key, value)])
    }

    fn set_all(&self, entries: &[(CredentialKey, &str)]) -> Result<(), StoreError> {
        let existing = if self.path.exists() {
            fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?
        } else {
            String::new()
        };

        let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
        for (key, value) in entries {
            let variable = self.variable(*key);
            let assignment = format!("{}={}", variable, quote(value));

            // Later duplicates would shadow the new value on read
            let mut written = false;
            lines.retain_mut(|line| {
                if assigned_variable(line) != Some(variable.as_str()) {
                    return true;
                }
                if written {
                    return false;
                }
                *line = assignment.clone();
                written = true;
                true
            });
            if !written {
                lines.push(assignment);
            }
        }

        let mut contents = lines.join("\n");
        contents.push('\n');

        tracing::debug!(path = %self.path.display(), keys = entries.len(), "Writing credential store");
        self.write(&contents)
    }
}

/// Name of the variable assigned on a dotenv line, if any.
fn assigned_variable(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    let (name, _) = line.split_once('=')?;
    Some(name.trim_end())
}

fn quote(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Snapshot of the persisted credential state.
///
/// Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct CredentialRecord {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub authorization_code: Option<String>,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    pub fn load<S: CredentialStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        let read = |key| -> Result<Option<String>, StoreError> {
            Ok(store.get(key)?.filter(|value| !value.trim().is_empty()))
        };

        Ok(Self {
            client_id: read(CredentialKey::ClientId)?,
            client_secret: read(CredentialKey::ClientSecret)?.map(SecretString::from),
            authorization_code: read(CredentialKey::AuthCode)?,
            access_token: read(CredentialKey::AccessToken)?.map(SecretString::from),
            refresh_token: read(CredentialKey::RefreshToken)?.map(SecretString::from),
            expires_at: read(CredentialKey::ExpiresAt)?.and_then(|raw| parse_expires_at(&raw)),
        })
    }
}

/// Parse a stored epoch timestamp. Fractional seconds are accepted and
/// truncated; anything else is treated as unknown.
pub fn parse_expires_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let seconds = raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64));

    match seconds.and_then(|s| DateTime::from_timestamp(s, 0)) {
        Some(ts) => Some(ts),
        None => {
            tracing::warn!(value = %raw, "Ignoring unreadable expiry timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> EnvFileStore {
        EnvFileStore::new(dir.path().join(".env"))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.get(CredentialKey::RefreshToken).unwrap(), None);
        let record = CredentialRecord::load(&store).unwrap();
        assert!(record.refresh_token.is_none());
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn set_all_preserves_unrelated_lines() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "# Strava app\nSTRAVA_CLIENT_ID=12345\nSTRAVA_CLIENT_SECRET='shh'\nOTHER=kept\nSTRAVA_ACCESS_TOKEN='old'\n",
        )
        .unwrap();

        store
            .set_all(&[
                (CredentialKey::AccessToken, "new-access"),
                (CredentialKey::RefreshToken, "new-refresh"),
                (CredentialKey::ExpiresAt, "1700000000"),
            ])
            .unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "# Strava app\nSTRAVA_CLIENT_ID=12345\nSTRAVA_CLIENT_SECRET='shh'\nOTHER=kept\n\
             STRAVA_ACCESS_TOKEN='new-access'\nSTRAVA_REFRESH_TOKEN='new-refresh'\n\
             STRAVA_EXPIRES_AT='1700000000'\n"
        );

        let record = CredentialRecord::load(&store).unwrap();
        assert_eq!(record.client_id.as_deref(), Some("12345"));
        assert_eq!(record.client_secret.unwrap().expose_secret(), "shh");
        assert_eq!(record.access_token.unwrap().expose_secret(), "new-access");
        assert_eq!(record.expires_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn set_all_collapses_duplicate_assignments() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "STRAVA_REFRESH_TOKEN=old1\nOTHER=kept\nexport STRAVA_REFRESH_TOKEN=old2\n",
        )
        .unwrap();

        store.set_all(&[(CredentialKey::RefreshToken, "new")]).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "STRAVA_REFRESH_TOKEN='new'\nOTHER=kept\n");

        let record = CredentialRecord::load(&store).unwrap();
        assert_eq!(record.refresh_token.unwrap().expose_secret(), "new");
    }

    #[test]
    fn exported_assignments_are_replaced() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "export STRAVA_AUTH_CODE=abc\n").unwrap();

        store.set(CredentialKey::AuthCode, "def").unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "STRAVA_AUTH_CODE='def'\n"
        );
    }

    #[test]
    fn values_with_quotes_survive_a_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.set(CredentialKey::AuthCode, "it's \"odd\"").unwrap();

        assert_eq!(
            store.get(CredentialKey::AuthCode).unwrap().as_deref(),
            Some("it's \"odd\"")
        );
    }

    #[test]
    fn custom_prefix_is_applied() {
        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::with_prefix(dir.path().join("creds.env"), "");

        store.set(CredentialKey::RefreshToken, "r1").unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "REFRESH_TOKEN='r1'\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn store_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set(CredentialKey::AccessToken, "a1").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn empty_values_are_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "STRAVA_REFRESH_TOKEN=\n").unwrap();

        let record = CredentialRecord::load(&store).unwrap();
        assert!(record.refresh_token.is_none());
    }

    #[test]
    fn expires_at_accepts_float_strings() {
        assert_eq!(parse_expires_at("1700000000.75").unwrap().timestamp(), 1_700_000_000);
        assert_eq!(parse_expires_at(" 300 ").unwrap().timestamp(), 300);
        assert!(parse_expires_at("soon").is_none());
    }
}
