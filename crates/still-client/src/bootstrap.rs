use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use still_types::models::User;

use crate::api::ApiClient;
use crate::device::DeviceStore;
use crate::error::ClientError;

pub const REGISTRATION_ATTEMPTS: u32 = 3;
pub const REGISTRATION_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Backend lookups needed to bind a device to a user.
pub trait UserDirectory: Send + Sync {
    fn find_by_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<User, ClientError>> + Send;

    fn register(&self, device_id: &str) -> impl Future<Output = Result<User, ClientError>> + Send;
}

impl UserDirectory for ApiClient {
    async fn find_by_device(&self, device_id: &str) -> Result<User, ClientError> {
        self.get_user_by_device_id(device_id).await
    }

    async fn register(&self, device_id: &str) -> Result<User, ClientError> {
        self.register_device(device_id).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub device_id: String,
    pub user_id: Uuid,
}

/// Resolve the user for this device.
///
/// A stored user ID is trusted as-is. Otherwise the device is looked up and,
/// if the backend does not know it, registered. The whole exchange is tried
/// `REGISTRATION_ATTEMPTS` times before giving up.
pub async fn resolve_user<D: UserDirectory>(
    directory: &D,
    store: &DeviceStore,
) -> Result<Identity, ClientError> {
    let device_id = store.device_id().await?;

    if let Some(user_id) = store.user_id().await? {
        info!("Using stored user ID {}", user_id);
        return Ok(Identity { device_id, user_id });
    }

    let mut attempt = 1;
    loop {
        match lookup_or_register(directory, &device_id).await {
            Ok(user) => {
                store.store_user_id(user.id).await?;
                info!("Device bound to user {}", user.id);
                return Ok(Identity {
                    device_id,
                    user_id: user.id,
                });
            }
            Err(e) if attempt >= REGISTRATION_ATTEMPTS => {
                return Err(ClientError::RegistrationFailed {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                warn!("Registration attempt {} failed: {}", attempt, e);
                attempt += 1;
                tokio::time::sleep(REGISTRATION_RETRY_DELAY).await;
            }
        }
    }
}

async fn lookup_or_register<D: UserDirectory>(
    directory: &D,
    device_id: &str,
) -> Result<User, ClientError> {
    match directory.find_by_device(device_id).await {
        Ok(user) => Ok(user),
        Err(e) if e.is_not_found() => {
            info!("Device not registered yet, registering");
            directory.register(device_id).await
        }
        Err(e) => Err(e),
    }
}
