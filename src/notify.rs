use std::fmt::Debug;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::mpsc::Receiver;

use crate::{Error, Trigger};

/// Capacity of the channel carrying [`AuthorityEvent`]s to the store
pub const EVENT_CHANNEL_SIZE: usize = 10;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) subtitle: Option<String>,
    pub(crate) sound: Option<String>,
}

impl NotificationContent {
    pub fn new() -> Self {
        NotificationContent::default()
    }

    /// Set primary description of notification
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    /// Set main content of notification
    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_owned();
        self
    }

    /// Set secondary description of notification
    pub fn subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_owned());
        self
    }

    /// Set notification sound
    ///
    ///   - Use "default" for default system sound
    ///   - Use filename without extension for custom sounds (must be in app bundle)
    pub fn sound(mut self, sound: &str) -> Self {
        self.sound = Some(sound.to_owned());
        self
    }
}

/// A notification handed to the authority, identified by a store-generated id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub subtitle: Option<String>,
    pub sound: Option<String>,
    pub trigger: Trigger,
}

impl NotificationRequest {
    pub fn new(identifier: String, content: NotificationContent, trigger: Trigger) -> Self {
        let NotificationContent {
            title,
            body,
            subtitle,
            sound,
        } = content;
        Self {
            identifier,
            title,
            body,
            subtitle,
            sound,
            trigger,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthorizationState {
    /// The user has not been asked yet
    #[default]
    Undetermined,
    Authorized,
    Denied,
}

impl AuthorizationState {
    pub fn is_authorized(self) -> bool {
        self == AuthorizationState::Authorized
    }
}

/// Capabilities asked for in a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub badge: bool,
    pub sound: bool,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            alert: true,
            badge: true,
            sound: true,
        }
    }
}

/// Unsolicited callbacks from the authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityEvent {
    /// A notification is about to be shown while the app is in the foreground
    WillPresent { identifier: String },
    /// The user interacted with a delivered notification
    Responded {
        identifier: String,
        action: ResponseAction,
    },
}

impl AuthorityEvent {
    pub fn identifier(&self) -> &str {
        match self {
            AuthorityEvent::WillPresent { identifier }
            | AuthorityEvent::Responded { identifier, .. } => identifier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseAction {
    /// When user clicks on the notification
    Default,
    /// When user closes the notification
    Dismiss,
    /// The identifier string of the action that the user selected
    Other(String),
}

/// The operating system service that owns notification permission, the pending
/// list, and delivery. Everything else in this crate only mirrors its state.
#[async_trait]
pub trait NotificationAuthority
where
    Self: Send + Sync + Debug,
{
    /// Ask the user for the given capabilities
    async fn request_authorization(&self, options: AuthorizationOptions) -> Result<bool, Error>;

    /// Read the current authorization state
    async fn current_settings(&self) -> Result<AuthorizationState, Error>;

    /// Hand a request over for scheduling
    async fn submit(&self, request: &NotificationRequest) -> Result<(), Error>;

    /// Remove pending requests by id, unknown ids are ignored
    async fn remove_pending(&self, identifiers: &[String]) -> Result<(), Error>;

    /// Remove every pending request, delivered notifications stay
    async fn remove_all_pending(&self) -> Result<(), Error>;

    /// Get all requests that are scheduled and not yet delivered
    async fn list_pending(&self) -> Result<Vec<NotificationRequest>, Error>;

    /// Take the receiving end of the authority's event stream.
    ///
    /// Only one subscriber is supported, a second call fails with
    /// [`Error::AlreadySubscribed`].
    fn subscribe(&self) -> Result<Receiver<AuthorityEvent>, Error>;

    /// Wall clock the authority schedules against
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
