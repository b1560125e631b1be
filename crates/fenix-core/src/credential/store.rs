// ── Credential persistence ──
//
// The credential pair survives restarts as a small JSON document in the
// storage directory. Writes go to a sibling temp file first and are renamed
// into place so a crash never leaves a truncated file behind.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// File name of the persisted credential pair.
pub const CREDENTIAL_FILE_NAME: &str = ".fenixTftWifi.config.json";

/// Token pair as persisted.
#[derive(Debug)]
pub struct StoredCredential {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

/// Durable storage for the credential pair.
pub trait CredentialStore: Send + Sync {
    /// Read the last persisted pair, `None` on first boot.
    fn load(&self) -> Result<Option<StoredCredential>, CoreError>;

    /// Replace the persisted pair.
    fn save(&self, credential: &StoredCredential) -> Result<(), CoreError>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    access_token: String,
    refresh_token: String,
}

/// JSON-file backed [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store the credential file inside `storage_dir`.
    pub fn in_dir(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            path: storage_dir.as_ref().join(CREDENTIAL_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, reason: impl ToString) -> CoreError {
        CoreError::Persistence {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl CredentialStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoredCredential>, CoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.persistence_error(e)),
        };

        let file: CredentialFile =
            serde_json::from_str(&raw).map_err(|e| self.persistence_error(e))?;
        debug!(path = %self.path.display(), "loaded persisted credentials");

        Ok(Some(StoredCredential {
            access_token: SecretString::from(file.access_token),
            refresh_token: SecretString::from(file.refresh_token),
        }))
    }

    fn save(&self, credential: &StoredCredential) -> Result<(), CoreError> {
        let file = CredentialFile {
            access_token: credential.access_token.expose_secret().to_owned(),
            refresh_token: credential.refresh_token.expose_secret().to_owned(),
        };
        let body = serde_json::to_vec_pretty(&file).map_err(|e| self.persistence_error(e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut handle = fs::File::create(&tmp).map_err(|e| self.persistence_error(e))?;
        handle
            .write_all(&body)
            .and_then(|()| handle.sync_all())
            .map_err(|e| self.persistence_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.persistence_error(e))?;

        debug!(path = %self.path.display(), "persisted credentials");
        Ok(())
    }
}

// ── In-memory store for tests ───────────────────────────────────────


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pair(access: &str, refresh: &str) -> StoredCredential {
        StoredCredential {
            access_token: SecretString::from(access.to_owned()),
            refresh_token: SecretString::from(refresh.to_owned()),
        }
    }

    #[test]
    fn missing_file_is_first_boot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());

        store.save(&pair("a1", "r1")).unwrap();
        store.save(&pair("a2", "r2")).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token.expose_secret(), "a2");
        assert_eq!(loaded.refresh_token.expose_secret(), "r2");
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        store.save(&pair("a", "r")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "accessToken": "a", "refreshToken": "r" }));
        assert!(store.path().ends_with(CREDENTIAL_FILE_NAME));
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(CoreError::Persistence { .. })));
    }
}
