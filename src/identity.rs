//! User identity used to scope remote documents.

use crate::storage::flags::{FlagError, FlagStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Flag-store key holding the minted device user id.
pub const DEVICE_USER_ID_KEY: &str = "device_user_id";

/// Supplies a stable opaque user id once ensured.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current user id, if authenticated.
    fn user_id(&self) -> Option<String>;

    /// Whether a user id is available.
    fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }

    /// Make sure a user id is available, establishing one if needed.
    async fn ensure_authenticated(&self) -> Result<String, IdentityError>;
}

/// Identity local to this device.
///
/// Uses the configured id when one is given. Otherwise a UUID is minted on
/// first ensure and remembered in the flag store, so the id is stable across
/// restarts.
pub struct LocalIdentity {
    flags: Arc<FlagStore>,
    user_id: Mutex<Option<String>>,
}

impl LocalIdentity {
    pub fn new(flags: Arc<FlagStore>, configured: Option<String>) -> Self {
        let known = configured
            .filter(|id| !id.trim().is_empty())
            .or_else(|| flags.get_string(DEVICE_USER_ID_KEY));

        Self {
            flags,
            user_id: Mutex::new(known),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn user_id(&self) -> Option<String> {
        self.user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn ensure_authenticated(&self) -> Result<String, IdentityError> {
        let mut current = self.user_id.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = current.as_ref() {
            return Ok(id.clone());
        }

        let minted = Uuid::new_v4().to_string();
        self.flags.set_string(DEVICE_USER_ID_KEY, &minted)?;
        tracing::info!("Minted device user id {}", minted);

        *current = Some(minted.clone());
        Ok(minted)
    }
}

/// Identity that is never authenticated; remote pushes are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Anonymous;

#[async_trait]
impl IdentityProvider for Anonymous {
    fn user_id(&self) -> Option<String> {
        None
    }

    async fn ensure_authenticated(&self) -> Result<String, IdentityError> {
        Err(IdentityError::Unavailable(
            "remote sync is disabled".to_string(),
        ))
    }
}

/// Identity errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to persist identity: {0}")]
    Persist(#[from] FlagError),
}
