//! Local device identity.
//!
//! The device ID is generated once and kept in a small JSON file next to the
//! user ID the backend assigned to it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ClientError;

const APP_DIR: &str = "still-the-want";
const STORE_FILE: &str = "identity.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct DeviceStore {
    path: PathBuf,
}

impl DeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/still-the-want/identity.json`
    pub fn default_location() -> Result<Self, ClientError> {
        let dir = dirs::data_dir()
            .ok_or_else(|| ClientError::Storage("no data directory on this platform".into()))?;
        Ok(Self::new(dir.join(APP_DIR).join(STORE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored device ID, generating and persisting one on first use.
    pub async fn device_id(&self) -> Result<String, ClientError> {
        let mut identity = self.load().await?;
        if let Some(id) = identity.device_id.as_ref() {
            return Ok(id.clone());
        }

        let id = Uuid::new_v4().to_string();
        info!("Generated new device ID");
        identity.device_id = Some(id.clone());
        self.save(&identity).await?;
        Ok(id)
    }

    pub async fn user_id(&self) -> Result<Option<Uuid>, ClientError> {
        Ok(self.load().await?.user_id)
    }

    pub async fn store_user_id(&self, user_id: Uuid) -> Result<(), ClientError> {
        let mut identity = self.load().await?;
        identity.user_id = Some(user_id);
        self.save(&identity).await?;
        debug!("Stored user ID {}", user_id);
        Ok(())
    }

    /// Forget the user but keep the device.
    pub async fn clear_user_id(&self) -> Result<(), ClientError> {
        let mut identity = self.load().await?;
        if identity.user_id.take().is_some() {
            self.save(&identity).await?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<StoredIdentity, ClientError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredIdentity::default());
            }
            Err(e) => {
                return Err(ClientError::Storage(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        // A damaged file is replaced on the next save rather than blocking startup.
        match serde_json::from_slice(&raw) {
            Ok(identity) => Ok(identity),
            Err(e) => {
                warn!("Ignoring unreadable identity file {}: {}", self.path.display(), e);
                Ok(StoredIdentity::default())
            }
        }
    }

    async fn save(&self, identity: &StoredIdentity) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| {
                    ClientError::Storage(format!("cannot create {}: {}", parent.display(), e))
                })?;
        }

        let json = serde_json::to_vec_pretty(identity)
            .map_err(|e| ClientError::Storage(format!("cannot encode identity: {}", e)))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| {
                ClientError::Storage(format!("cannot write {}: {}", self.path.display(), e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    // Nested so the store has to create its own directory.
    fn temp_store() -> (TempDir, DeviceStore) {
        let dir = tempdir().unwrap();
        let store = DeviceStore::new(dir.path().join("still").join(STORE_FILE));
        (dir, store)
    }

    #[tokio::test]
    async fn device_id_is_generated_once() {
        let (_dir, store) = temp_store();
        let first = store.device_id().await.unwrap();
        let second = store.device_id().await.unwrap();
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());

        // A fresh handle on the same file sees the same ID.
        let reopened = DeviceStore::new(store.path());
        assert_eq!(reopened.device_id().await.unwrap(), first);
    }

    #[tokio::test]
    async fn user_id_round_trips_without_touching_device_id() {
        let (_dir, store) = temp_store();
        assert_eq!(store.user_id().await.unwrap(), None);

        let device = store.device_id().await.unwrap();
        let user = Uuid::new_v4();
        store.store_user_id(user).await.unwrap();
        assert_eq!(store.user_id().await.unwrap(), Some(user));
        assert_eq!(store.device_id().await.unwrap(), device);

        store.clear_user_id().await.unwrap();
        assert_eq!(store.user_id().await.unwrap(), None);
        assert_eq!(store.device_id().await.unwrap(), device);
    }

    #[tokio::test]
    async fn damaged_file_starts_fresh() {
        let (_dir, store) = temp_store();
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        assert_eq!(store.user_id().await.unwrap(), None);
        let id = store.device_id().await.unwrap();
        assert_eq!(store.device_id().await.unwrap(), id);
    }
}
