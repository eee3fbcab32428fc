use std::path::{Path, PathBuf};

use crate::{error::AuthError, types::CredentialBundle};

/// JSON file holding the credential bundle.
///
/// Writes replace the whole file through a temporary sibling and a rename, so
/// a concurrent reader sees either the old or the new bundle, and two writers
/// resolve as last-writer-wins.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        CredentialStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when no credentials have been stored yet.
    pub async fn load(&self) -> Result<Option<CredentialBundle>, AuthError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Storage(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let bundle: CredentialBundle = serde_json::from_str(&content).map_err(|e| {
            AuthError::Storage(format!("cannot parse {}: {}", self.path.display(), e))
        })?;
        Ok(Some(bundle))
    }

    pub async fn persist(&self, bundle: &CredentialBundle) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        let json =
            serde_json::to_string_pretty(bundle).map_err(|e| AuthError::Storage(e.to_string()))?;

        let tmp = self.tmp_path();
        async_fs::write(&tmp, json)
            .await
            .map_err(|e| AuthError::Storage(format!("cannot write {}: {}", tmp.display(), e)))?;

        // owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            async_fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        async_fs::rename(&tmp, &self.path).await.map_err(|e| {
            AuthError::Storage(format!("cannot replace {}: {}", self.path.display(), e))
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "token.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn bundle() -> CredentialBundle {
        CredentialBundle {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::seconds(3600),
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("cache").join("token.json"));

        let written = bundle();
        store.persist(&written).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, Some(written));
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = CredentialStore::new(path);
        assert!(matches!(store.load().await, Err(AuthError::Storage(_))));
    }

    #[tokio::test]
    async fn test_persist_overwrites_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        store.persist(&bundle()).await.unwrap();
        let mut second = bundle();
        second.access_token = "newer".to_string();
        store.persist(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(second));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        store.persist(&bundle()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
