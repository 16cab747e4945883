//! In-process notification authority with a virtual clock.
//!
//! Behaves like the system notification center closely enough to drive the
//! store and session deterministically: permission is asked once and then
//! sticks, submissions need authorization, identical ids replace each other,
//! and requests are delivered when the clock is advanced past their fire date.

use std::{
    sync::{Arc, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use crate::{
    AuthorityEvent, AuthorizationOptions, AuthorizationState, Error, NotificationAuthority,
    NotificationRequest, EVENT_CHANNEL_SIZE,
};

/// Record of an authority call, in the order the calls were made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityCall {
    RequestAuthorization,
    CurrentSettings,
    Submit,
    RemovePending,
    RemoveAllPending,
    ListPending,
}

#[derive(Debug)]
struct Scheduled {
    request: NotificationRequest,
    fire_at: NaiveDateTime,
}

#[derive(Debug)]
struct MemoryState {
    authorization: AuthorizationState,
    /// What the simulated user answers to the first permission prompt
    answer: bool,
    fail_next_authorization: Option<String>,
    fail_next_submit: Option<String>,
    fail_next_list: Option<String>,
    foreground: bool,
    pending: Vec<Scheduled>,
    delivered: Vec<NotificationRequest>,
    calls: Vec<AuthorityCall>,
}

#[derive(Debug)]
struct MemoryAuthorityInner {
    state: Mutex<MemoryState>,
    /// Virtual clock, kept outside `state` so reading it never waits
    clock: std::sync::Mutex<NaiveDateTime>,
    events: Sender<AuthorityEvent>,
    receiver: std::sync::Mutex<Option<Receiver<AuthorityEvent>>>,
}

/// Cloning shares the same simulated notification center
#[derive(Debug, Clone)]
pub struct MemoryAuthority {
    inner: Arc<MemoryAuthorityInner>,
}

impl Default for MemoryAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthority {
    pub fn new() -> Self {
        Self::starting_at(chrono::Local::now().naive_local())
    }

    /// Start the virtual clock at `now`
    pub fn starting_at(now: NaiveDateTime) -> Self {
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_SIZE);

        Self {
            inner: Arc::new(MemoryAuthorityInner {
                state: Mutex::new(MemoryState {
                    authorization: AuthorizationState::Undetermined,
                    answer: true,
                    fail_next_authorization: None,
                    fail_next_submit: None,
                    fail_next_list: None,
                    foreground: true,
                    pending: Vec::new(),
                    delivered: Vec::new(),
                    calls: Vec::new(),
                }),
                clock: std::sync::Mutex::new(now),
                events,
                receiver: std::sync::Mutex::new(Some(receiver)),
            }),
        }
    }

    /// Set what the simulated user answers when first asked for permission
    pub async fn answer_permission_prompt(&self, granted: bool) {
        self.inner.state.lock().await.answer = granted;
    }

    /// Change the authorization the way the user would in system settings
    pub async fn set_authorization(&self, authorization: AuthorizationState) {
        self.inner.state.lock().await.authorization = authorization;
    }

    /// Foreground apps get a [`AuthorityEvent::WillPresent`] per delivery
    pub async fn set_foreground(&self, foreground: bool) {
        self.inner.state.lock().await.foreground = foreground;
    }

    pub async fn fail_next_authorization(&self, reason: &str) {
        self.inner.state.lock().await.fail_next_authorization = Some(reason.to_owned());
    }

    pub async fn fail_next_submit(&self, reason: &str) {
        self.inner.state.lock().await.fail_next_submit = Some(reason.to_owned());
    }

    pub async fn fail_next_list(&self, reason: &str) {
        self.inner.state.lock().await.fail_next_list = Some(reason.to_owned());
    }

    fn clock(&self) -> MutexGuard<'_, NaiveDateTime> {
        self.inner
            .clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the virtual clock forward and deliver everything that came due.
    ///
    /// Returns the delivered identifiers in firing order.
    pub async fn advance(&self, by: Duration) -> Result<Vec<String>, Error> {
        let by = chrono::Duration::from_std(by).map_err(|err| Error::Other(err.to_string()))?;
        let mut state = self.inner.state.lock().await;
        let now = {
            let mut clock = self.clock();
            *clock = clock
                .checked_add_signed(by)
                .ok_or_else(|| Error::Other("virtual clock overflow".to_owned()))?;
            *clock
        };

        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|scheduled| scheduled.fire_at <= now);
        state.pending = waiting;
        due.sort_by_key(|scheduled| scheduled.fire_at);

        let mut delivered = Vec::with_capacity(due.len());
        for Scheduled { request, .. } in due {
            log::debug!("memory authority: delivering {}", request.identifier);
            if state.foreground {
                self.emit(AuthorityEvent::WillPresent {
                    identifier: request.identifier.clone(),
                });
            }
            delivered.push(request.identifier.clone());
            state.delivered.push(request);
        }

        Ok(delivered)
    }

    /// Push an event to the subscriber, dropped with an error log if the channel is full
    pub fn emit(&self, event: AuthorityEvent) -> bool {
        match self.inner.events.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Failed to send authority event: {err:?}");
                false
            }
        }
    }

    pub async fn delivered(&self) -> Vec<NotificationRequest> {
        self.inner.state.lock().await.delivered.clone()
    }

    /// Pending requests as the authority sees them, without recording a call
    pub async fn pending_ids(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .await
            .pending
            .iter()
            .map(|scheduled| scheduled.request.identifier.clone())
            .collect()
    }

    pub async fn calls(&self) -> Vec<AuthorityCall> {
        self.inner.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.inner.state.lock().await.calls.clear();
    }
}

#[async_trait]
impl NotificationAuthority for MemoryAuthority {
    async fn request_authorization(&self, options: AuthorizationOptions) -> Result<bool, Error> {
        let mut state = self.inner.state.lock().await;
        state.calls.push(AuthorityCall::RequestAuthorization);

        if let Some(reason) = state.fail_next_authorization.take() {
            return Err(Error::Rejected(reason));
        }
        if !(options.alert || options.badge || options.sound) {
            return Err(Error::Rejected("no capabilities requested".to_owned()));
        }
        if state.authorization == AuthorizationState::Undetermined {
            state.authorization = if state.answer {
                AuthorizationState::Authorized
            } else {
                AuthorizationState::Denied
            };
        }

        Ok(state.authorization.is_authorized())
    }

    async fn current_settings(&self) -> Result<AuthorizationState, Error> {
        let mut state = self.inner.state.lock().await;
        state.calls.push(AuthorityCall::CurrentSettings);
        Ok(state.authorization)
    }

    async fn submit(&self, request: &NotificationRequest) -> Result<(), Error> {
        let mut state = self.inner.state.lock().await;
        state.calls.push(AuthorityCall::Submit);

        if let Some(reason) = state.fail_next_submit.take() {
            return Err(Error::Rejected(reason));
        }
        if !state.authorization.is_authorized() {
            return Err(Error::NotAuthorized);
        }
        let fire_at = request
            .trigger
            .next_fire_after(*self.clock())
            .ok_or_else(|| Error::Rejected(format!("{:?} never fires", request.trigger)))?;

        let scheduled = Scheduled {
            request: request.clone(),
            fire_at,
        };
        match state
            .pending
            .iter_mut()
            .find(|existing| existing.request.identifier == request.identifier)
        {
            Some(existing) => *existing = scheduled,
            None => state.pending.push(scheduled),
        }

        Ok(())
    }

    async fn remove_pending(&self, identifiers: &[String]) -> Result<(), Error> {
        let mut state = self.inner.state.lock().await;
        state.calls.push(AuthorityCall::RemovePending);
        state
            .pending
            .retain(|scheduled| !identifiers.contains(&scheduled.request.identifier));
        Ok(())
    }

    async fn remove_all_pending(&self) -> Result<(), Error> {
        let mut state = self.inner.state.lock().await;
        state.calls.push(AuthorityCall::RemoveAllPending);
        state.pending.clear();
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<NotificationRequest>, Error> {
        let mut state = self.inner.state.lock().await;
        state.calls.push(AuthorityCall::ListPending);

        if let Some(reason) = state.fail_next_list.take() {
            return Err(Error::Rejected(reason));
        }
        Ok(state
            .pending
            .iter()
            .map(|scheduled| scheduled.request.clone())
            .collect())
    }

    fn subscribe(&self) -> Result<Receiver<AuthorityEvent>, Error> {
        self.inner
            .receiver
            .lock()
            .map_err(|_| Error::Other("event receiver lock poisoned".to_owned()))?
            .take()
            .ok_or(Error::AlreadySubscribed)
    }

    fn now(&self) -> NaiveDateTime {
        *self.clock()
    }
}
