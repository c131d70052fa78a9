use crate::User;
use serde_derive::{Deserialize, Serialize};
use std::{
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

/// The token and user snapshot which make up a persisted session.
#[derive(Clone, PartialEq)]
pub struct StoredCredentials {
    pub token: String,
    pub user: User,
}

impl Debug for StoredCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Somewhere to keep the session between runs.
///
/// Implementations must write and clear the token and the user together, so
/// a reader never sees one without the other.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn load(
        &self,
    ) -> Result<Option<StoredCredentials>, SecretStoreError>;
    async fn save(
        &self,
        credentials: &StoredCredentials,
    ) -> Result<(), SecretStoreError>;
    async fn clear(&self) -> Result<(), SecretStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("Unable to access \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        inner: std::io::Error,
    },
    #[error("The stored credentials are corrupted")]
    Corrupted(#[from] serde_json::Error),
}

/// A [`SecretStore`] which forgets everything when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: Mutex<Option<StoredCredentials>>,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        MemoryStore {
            credentials: Mutex::new(Some(credentials)),
        }
    }
}

#[async_trait::async_trait]
impl SecretStore for MemoryStore {
    async fn load(
        &self,
    ) -> Result<Option<StoredCredentials>, SecretStoreError> {
        Ok(self.credentials.lock().await.clone())
    }

    async fn save(
        &self,
        credentials: &StoredCredentials,
    ) -> Result<(), SecretStoreError> {
        *self.credentials.lock().await = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SecretStoreError> {
        *self.credentials.lock().await = None;
        Ok(())
    }
}

/// The on-disk layout used by [`FileStore`]: one entry for the token and one
/// for the serialized user.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Entries {
    token: Option<String>,
    user: Option<String>,
}

/// A [`SecretStore`] backed by a JSON file only the current user can read.
///
/// Writes go to a temporary file which is renamed into place, so the token
/// and user entries always change together.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileStore { path: path.into() }
    }

    /// `$CONFIG_DIR/riverlog/credentials.json`, if the platform has a config
    /// directory.
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("riverlog").join("credentials.json"))
    }

    pub fn path(&self) -> &Path { &self.path }

    fn io_error(&self, inner: std::io::Error) -> SecretStoreError {
        SecretStoreError::Io {
            path: self.path.clone(),
            inner,
        }
    }

    async fn write_entries(
        &self,
        entries: &Entries,
    ) -> Result<(), SecretStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let serialized = serde_json::to_vec_pretty(entries)?;
        let temp = self.path.with_extension("tmp");

        // a leftover from an interrupted write may have looser permissions
        match tokio::fs::remove_file(&temp).await {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => return Err(self.io_error(e)),
        }
        write_private(&temp, &serialized)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SecretStore for FileStore {
    async fn load(
        &self,
    ) -> Result<Option<StoredCredentials>, SecretStoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(None)
            },
            Err(e) => return Err(self.io_error(e)),
        };

        let entries: Entries = serde_json::from_slice(&raw)?;

        match (entries.token, entries.user) {
            (Some(token), Some(user)) => {
                let user = serde_json::from_str(&user)?;
                Ok(Some(StoredCredentials { token, user }))
            },
            (None, None) => Ok(None),
            _ => {
                log::warn!(
                    "Ignoring half-written credentials in \"{}\"",
                    self.path.display()
                );
                Ok(None)
            },
        }
    }

    async fn save(
        &self,
        credentials: &StoredCredentials,
    ) -> Result<(), SecretStoreError> {
        let entries = Entries {
            token: Some(credentials.token.clone()),
            user: Some(serde_json::to_string(&credentials.user)?),
        };

        self.write_entries(&entries).await
    }

    async fn clear(&self) -> Result<(), SecretStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Create a new file which only the current user can read, and fill it.
async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    owner_only(&mut options);

    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

#[cfg(unix)]
fn owner_only(options: &mut OpenOptions) { options.mode(0o600); }

#[cfg(not(unix))]
fn owner_only(_options: &mut OpenOptions) {}
