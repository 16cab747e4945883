//! Stub authority for platforms without a local notification scheduler.
//!
//! Every operation returns [`Error::NotSupported`]. Use
//! [`MemoryAuthority`](crate::memory::MemoryAuthority) to run the store here.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

use crate::{
    AuthorityEvent, AuthorizationOptions, AuthorizationState, Error, NotificationAuthority,
    NotificationRequest,
};

/// Stub notification authority.
#[derive(Debug, Clone)]
pub struct UserNotificationCenter {
    _inner: Arc<()>,
}

impl UserNotificationCenter {
    /// Creates a new authority instance (stub).
    #[allow(clippy::new_without_default)]
    pub fn new_() -> Self {
        Self {
            _inner: Arc::new(()),
        }
    }

    /// Attempts to create a new authority (stub).
    pub fn try_new() -> Result<Self, Error> {
        Ok(Self::new_())
    }
}

#[async_trait]
impl NotificationAuthority for UserNotificationCenter {
    async fn request_authorization(&self, _options: AuthorizationOptions) -> Result<bool, Error> {
        Err(Error::NotSupported)
    }

    async fn current_settings(&self) -> Result<AuthorizationState, Error> {
        Err(Error::NotSupported)
    }

    async fn submit(&self, _request: &NotificationRequest) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    async fn remove_pending(&self, _identifiers: &[String]) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    async fn remove_all_pending(&self) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    async fn list_pending(&self) -> Result<Vec<NotificationRequest>, Error> {
        Err(Error::NotSupported)
    }

    fn subscribe(&self) -> Result<Receiver<AuthorityEvent>, Error> {
        Err(Error::NotSupported)
    }
}
