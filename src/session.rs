use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};
use url::Url;

use crate::{
    AuthorizationState, CalendarMatch, Error, NotificationAuthority, PendingSnapshot,
    PendingStore, PermissionTracker, SessionConfig, Trigger,
};

/// Lifecycle phase reported by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePhase {
    Active,
    Inactive,
    Background,
}

/// What a notification screen needs: permission state, the pending list, and
/// the commands behind its buttons.
///
/// The authority may change both the permission and the pending list while
/// the app is suspended, so the UI calls [`on_phase_change`](Self::on_phase_change)
/// on every lifecycle transition.
#[derive(Debug)]
pub struct NotificationSession<A: NotificationAuthority + 'static> {
    permission: PermissionTracker<A>,
    pending: PendingStore<A>,
    status: watch::Sender<AuthorizationState>,
    config: SessionConfig,
    listener: JoinHandle<()>,
}

impl<A: NotificationAuthority + 'static> NotificationSession<A> {
    /// Wire up the tracker, the store and the authority event listener.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(authority: A, config: SessionConfig) -> Result<Self, Error> {
        let authority = Arc::new(authority);
        let events = authority.subscribe()?;

        let permission =
            PermissionTracker::with_options(Arc::clone(&authority), config.authorization);
        let pending = PendingStore::new(authority);
        let listener = pending.listen(events);
        let (status, _) = watch::channel(AuthorizationState::Undetermined);

        Ok(Self {
            permission,
            pending,
            status,
            config,
            listener,
        })
    }

    /// Ask for permission, then read back what the authority decided
    pub async fn request_permission(&self) -> Result<AuthorizationState, Error> {
        self.permission.request_permission().await?;
        self.read_status().await
    }

    pub async fn on_phase_change(&self, phase: ScenePhase) -> Result<(), Error> {
        log::debug!("scene phase changed to {phase:?}");
        if phase == ScenePhase::Active {
            self.resync().await?;
        }
        Ok(())
    }

    /// Re-read permission and the pending list from the authority
    pub async fn resync(&self) -> Result<AuthorizationState, Error> {
        let status = self.read_status().await?;
        self.pending.refresh().await?;
        Ok(status)
    }

    async fn read_status(&self) -> Result<AuthorizationState, Error> {
        let status = self.permission.current_status().await?;
        self.status.send_replace(status);
        Ok(status)
    }

    /// Schedule the configured content `seconds` from now
    ///
    /// # Errors
    /// - `Error::IntervalOutOfRange` if `seconds` is outside the configured range
    /// - anything [`PendingStore::schedule_content`] returns
    pub async fn schedule_after(&self, seconds: u64) -> Result<String, Error> {
        let range = &self.config.interval_range;
        if !range.contains(&seconds) {
            return Err(Error::IntervalOutOfRange {
                seconds,
                min: *range.start(),
                max: *range.end(),
            });
        }
        self.pending
            .schedule_content(
                Trigger::after(Duration::from_secs(seconds)),
                self.config.content.clone(),
            )
            .await
    }

    /// Schedule the configured content at the next moment matching `components`
    pub async fn schedule_at(&self, components: CalendarMatch) -> Result<String, Error> {
        self.pending
            .schedule_content(Trigger::at(components), self.config.content.clone())
            .await
    }

    pub async fn cancel(&self, identifier: &str) -> Result<(), Error> {
        self.pending.cancel(identifier).await
    }

    pub async fn clear_all(&self) -> Result<(), Error> {
        self.pending.clear_all().await
    }

    pub async fn refresh(&self) -> Result<(), Error> {
        self.pending.refresh().await
    }

    /// Authorization as of the last read
    pub fn status(&self) -> AuthorizationState {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AuthorizationState> {
        self.status.subscribe()
    }

    pub fn pending(&self) -> PendingSnapshot {
        self.pending.snapshot()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<PendingSnapshot> {
        self.pending.subscribe()
    }

    /// System settings page to send the user to once they have denied permission
    pub fn settings_url(&self) -> Result<Option<Url>, Error> {
        if self.status() != AuthorizationState::Denied {
            return Ok(None);
        }
        Ok(Some(Url::parse(&self.config.settings_url)?))
    }

    pub fn permission(&self) -> &PermissionTracker<A> {
        &self.permission
    }

    pub fn store(&self) -> &PendingStore<A> {
        &self.pending
    }
}

impl<A: NotificationAuthority + 'static> Drop for NotificationSession<A> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
