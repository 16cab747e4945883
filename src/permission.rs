use std::sync::Arc;

use crate::{AuthorizationOptions, AuthorizationState, Error, NotificationAuthority};

/// Asks for and reads notification permission.
///
/// Nothing is cached here: the authority is the only party allowed to change
/// the authorization, e.g. when the user flips it in system settings.
#[derive(Debug)]
pub struct PermissionTracker<A> {
    authority: Arc<A>,
    options: AuthorizationOptions,
}

impl<A> Clone for PermissionTracker<A> {
    fn clone(&self) -> Self {
        Self {
            authority: Arc::clone(&self.authority),
            options: self.options,
        }
    }
}

impl<A: NotificationAuthority> PermissionTracker<A> {
    pub fn new(authority: Arc<A>) -> Self {
        Self::with_options(authority, AuthorizationOptions::default())
    }

    pub fn with_options(authority: Arc<A>, options: AuthorizationOptions) -> Self {
        Self { authority, options }
    }

    /// Ask for alert, badge and sound capabilities
    ///
    /// # Returns
    /// `true` if granted, `false` if the user declined
    ///
    /// # Errors
    /// - `Error::PermissionRequestFailed` wrapping the authority's failure
    pub async fn request_permission(&self) -> Result<bool, Error> {
        match self.authority.request_authorization(self.options).await {
            Ok(granted) => {
                log::info!("notification permission granted: {granted}");
                Ok(granted)
            }
            Err(err) => {
                log::error!("notification permission request failed: {err}");
                Err(Error::PermissionRequestFailed(Box::new(err)))
            }
        }
    }

    /// Like [`Self::request_permission`], but a failed request counts as a denial
    pub async fn request_permission_or_deny(&self) -> bool {
        self.request_permission().await.unwrap_or(false)
    }

    /// Read the authorization state from the authority
    pub async fn current_status(&self) -> Result<AuthorizationState, Error> {
        let status = self.authority.current_settings().await?;
        log::debug!("notification authorization status: {status:?}");
        Ok(status)
    }
}
