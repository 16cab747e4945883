mod builder;
mod delegate;

use crate::{
    AuthorityEvent, AuthorizationOptions, AuthorizationState, Error, NotificationAuthority,
    NotificationRequest, EVENT_CHANNEL_SIZE,
};
use async_trait::async_trait;
use delegate::NotificationDelegate;
use objc2::{
    rc::Retained,
    runtime::{Bool, ProtocolObject},
    MainThreadMarker,
};
use objc2_foundation::{NSArray, NSBundle, NSError, NSString};
use objc2_user_notifications::{
    UNAuthorizationOptions, UNAuthorizationStatus, UNNotificationRequest,
    UNNotificationSettings, UNUserNotificationCenter, UNUserNotificationCenterDelegate,
};
use send_wrapper::SendWrapper;
use std::{cell::OnceCell, cell::RefCell, ptr::NonNull, sync::Arc};
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Constants and Type Aliases
// ============================================================================

/// `UNErrorCodeNotificationsNotAllowed`
const NOTIFICATIONS_NOT_ALLOWED: isize = 1;

/// Type alias for the delegate reference stored in the authority
type DelegateReference =
    SendWrapper<OnceCell<Retained<ProtocolObject<dyn UNUserNotificationCenterDelegate>>>>;

// ============================================================================
// UserNotificationCenter - the system authority
// ============================================================================

/// Internal state for the Apple notification authority
#[derive(Debug)]
pub struct UserNotificationCenterInner {
    /// Reference to the notification delegate to prevent it from being dropped
    ///
    /// The notification center only keeps a weak reference to its delegate.
    delegate_reference: DelegateReference,

    /// The application's bundle identifier
    ///
    /// Required for all notification operations.
    /// Derived from `NSBundle.mainBundle.bundleIdentifier`.
    pub(crate) bundle_id: Option<String>,
}

/// Notification authority backed by the UserNotifications framework
///
/// # Architecture
/// Completion-handler based framework calls are bridged to async with
/// `tokio::sync::oneshot` channels. Delegate callbacks are forwarded as
/// [`AuthorityEvent`]s through a bounded `mpsc` channel.
///
/// # Thread Safety
/// Create the authority and call [`NotificationAuthority::subscribe`] on the
/// main thread. The async operations may run on any thread.
///
/// # References
/// - [UserNotifications Framework](https://developer.apple.com/documentation/usernotifications)
/// - [UNUserNotificationCenter](https://developer.apple.com/documentation/usernotifications/unusernotificationcenter)
#[derive(Debug, Clone)]
pub struct UserNotificationCenter {
    inner: Arc<UserNotificationCenterInner>,
}

impl UserNotificationCenter {
    /// Creates a new authority
    ///
    /// # Note
    /// The bundle identifier is retrieved during construction and cached.
    /// If no bundle identifier is available, notification operations will fail.
    #[allow(clippy::new_without_default)]
    pub fn new_() -> Self {
        Self {
            inner: Arc::new(UserNotificationCenterInner {
                delegate_reference: SendWrapper::new(OnceCell::new()),
                bundle_id: Self::get_bundle_identifier(),
            }),
        }
    }

    /// Creates a new authority, failing when the process has no bundle identifier
    pub fn try_new() -> Result<Self, Error> {
        let center = Self::new_();
        center.ensure_valid_bundle_id()?;
        Ok(center)
    }

    /// Retrieves the application's bundle identifier
    ///
    /// # References
    /// - [NSBundle.bundleIdentifier](https://developer.apple.com/documentation/foundation/nsbundle/1418023-bundleidentifier)
    fn get_bundle_identifier() -> Option<String> {
        unsafe {
            NSBundle::mainBundle()
                .bundleIdentifier()
                .map(|ns_string| ns_string.to_string())
        }
    }

    fn ensure_valid_bundle_id(&self) -> Result<&str, Error> {
        self.inner.bundle_id.as_deref().ok_or(Error::NoBundleId)
    }

    /// Creates a completion handler for add-request calls
    ///
    /// # References
    /// - [UNUserNotificationCenter.addNotificationRequest](https://developer.apple.com/documentation/usernotifications/unusernotificationcenter/1649508-addnotificationrequest)
    fn create_completion_handler(
        sender: oneshot::Sender<Result<(), Error>>,
    ) -> block2::RcBlock<dyn Fn(*mut NSError)> {
        let cb = RefCell::new(Some(sender));

        block2::RcBlock::new(move |error: *mut NSError| {
            if let Some(cb) = cb.take() {
                let result = if error.is_null() {
                    Ok(())
                } else {
                    Err(Error::from(unsafe { &*error }))
                };
                if cb.send(result).is_err() {
                    log::error!("The receiver dropped");
                }
            }
        })
    }

    /// Creates a completion handler for authorization requests
    ///
    /// A "not allowed" error means the user turned notifications off, which is
    /// reported as a plain denial.
    fn create_authorization_handler(
        sender: oneshot::Sender<Result<bool, Error>>,
    ) -> block2::RcBlock<dyn Fn(Bool, *mut NSError)> {
        let cb = RefCell::new(Some(sender));

        block2::RcBlock::new(move |authorized: Bool, error: *mut NSError| {
            if let Some(cb) = cb.take() {
                let result = if error.is_null() {
                    Ok(authorized.as_bool())
                } else {
                    match Error::from(unsafe { &*error }) {
                        Error::NSError { code, .. } if code == NOTIFICATIONS_NOT_ALLOWED => {
                            Ok(false)
                        }
                        err => Err(err),
                    }
                };

                if cb.send(result).is_err() {
                    log::error!("The receiver dropped");
                }
            }
        })
    }

    /// Creates a completion handler for notification settings queries
    fn create_settings_handler(
        sender: oneshot::Sender<AuthorizationState>,
    ) -> block2::RcBlock<dyn Fn(NonNull<UNNotificationSettings>)> {
        let cb = RefCell::new(Some(sender));

        block2::RcBlock::new(move |settings: NonNull<UNNotificationSettings>| {
            if let Some(cb) = cb.take() {
                let status = unsafe { settings.as_ref().authorizationStatus() };

                if cb.send(Self::authorization_state(status)).is_err() {
                    log::error!("The receiver dropped");
                }
            }
        })
    }

    /// Creates a completion handler for the pending request list
    ///
    /// # References
    /// - [getPendingNotificationRequests](https://developer.apple.com/documentation/usernotifications/unusernotificationcenter/1649513-getpendingnotificationrequests)
    fn create_pending_handler(
        sender: oneshot::Sender<Vec<NotificationRequest>>,
    ) -> block2::RcBlock<dyn Fn(NonNull<NSArray<UNNotificationRequest>>)> {
        let cb = RefCell::new(Some(sender));

        block2::RcBlock::new(move |requests: NonNull<NSArray<UNNotificationRequest>>| {
            if let Some(cb) = cb.take() {
                let requests: &NSArray<UNNotificationRequest> = unsafe { requests.as_ref() };
                let pending = requests
                    .iter()
                    .filter_map(|request| builder::parse(&request))
                    .collect();

                if cb.send(pending).is_err() {
                    log::error!("The receiver dropped");
                }
            } else {
                log::error!("tx was already taken out");
            }
        })
    }

    /// Maps the system status onto the three states the crate tracks
    ///
    /// # References
    /// - [UNAuthorizationStatus](https://developer.apple.com/documentation/usernotifications/unauthorizationstatus)
    fn authorization_state(status: UNAuthorizationStatus) -> AuthorizationState {
        match status {
            UNAuthorizationStatus::Authorized
            | UNAuthorizationStatus::Provisional
            | UNAuthorizationStatus::Ephemeral => AuthorizationState::Authorized,
            UNAuthorizationStatus::Denied => AuthorizationState::Denied,
            UNAuthorizationStatus::NotDetermined => AuthorizationState::Undetermined,
            _ => {
                log::error!("Unknown authorization status: {:?}", status);
                AuthorizationState::Undetermined
            }
        }
    }

    fn native_options(options: AuthorizationOptions) -> UNAuthorizationOptions {
        let mut native = UNAuthorizationOptions::empty();
        native.set(UNAuthorizationOptions::Alert, options.alert);
        native.set(UNAuthorizationOptions::Badge, options.badge);
        native.set(UNAuthorizationOptions::Sound, options.sound);
        native
    }
}

#[async_trait]
impl NotificationAuthority for UserNotificationCenter {
    /// # References
    /// - [UNUserNotificationCenter.requestAuthorizationWithOptions](https://developer.apple.com/documentation/usernotifications/unusernotificationcenter/1649527-requestauthorizationwithoptions)
    async fn request_authorization(&self, options: AuthorizationOptions) -> Result<bool, Error> {
        self.ensure_valid_bundle_id()?;

        let (tx, rx) = oneshot::channel::<Result<bool, Error>>();
        {
            let block = Self::create_authorization_handler(tx);
            unsafe {
                UNUserNotificationCenter::currentNotificationCenter()
                    .requestAuthorizationWithOptions_completionHandler(
                        Self::native_options(options),
                        &block,
                    );
            }
        }

        rx.await?
    }

    /// # References
    /// - [UNUserNotificationCenter.getNotificationSettings](https://developer.apple.com/documentation/usernotifications/unusernotificationcenter/1649524-getnotificationsettings)
    async fn current_settings(&self) -> Result<AuthorizationState, Error> {
        self.ensure_valid_bundle_id()?;

        let (tx, rx) = oneshot::channel::<AuthorizationState>();
        {
            let block = Self::create_settings_handler(tx);
            unsafe {
                UNUserNotificationCenter::currentNotificationCenter()
                    .getNotificationSettingsWithCompletionHandler(&block);
            }
        }

        Ok(rx.await?)
    }

    async fn submit(&self, request: &NotificationRequest) -> Result<(), Error> {
        self.ensure_valid_bundle_id()?;

        let (tx, rx) = oneshot::channel::<Result<(), Error>>();
        {
            let native = builder::build(request);
            let block = Self::create_completion_handler(tx);
            unsafe {
                UNUserNotificationCenter::currentNotificationCenter()
                    .addNotificationRequest_withCompletionHandler(&native, Some(&block));
            }
        }

        rx.await?
    }

    /// # References
    /// - [removePendingNotificationRequestsWithIdentifiers](https://developer.apple.com/documentation/usernotifications/unusernotificationcenter/1649517-removependingnotificationrequest)
    async fn remove_pending(&self, identifiers: &[String]) -> Result<(), Error> {
        self.ensure_valid_bundle_id()?;

        let ns_ids: Vec<_> = identifiers.iter().map(|s| NSString::from_str(s)).collect();
        let array: Retained<NSArray<NSString>> = NSArray::from_retained_slice(ns_ids.as_slice());

        unsafe {
            UNUserNotificationCenter::currentNotificationCenter()
                .removePendingNotificationRequestsWithIdentifiers(&array);
        }

        Ok(())
    }

    async fn remove_all_pending(&self) -> Result<(), Error> {
        self.ensure_valid_bundle_id()?;

        unsafe {
            UNUserNotificationCenter::currentNotificationCenter()
                .removeAllPendingNotificationRequests();
        }

        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<NotificationRequest>, Error> {
        self.ensure_valid_bundle_id()?;

        let (tx, rx) = oneshot::channel::<Vec<NotificationRequest>>();
        {
            let completion_handler = Self::create_pending_handler(tx);
            unsafe {
                UNUserNotificationCenter::currentNotificationCenter()
                    .getPendingNotificationRequestsWithCompletionHandler(&completion_handler);
            }
        }

        Ok(rx.await?)
    }

    /// Installs the delegate that forwards framework callbacks as events
    ///
    /// # Errors
    /// - `Error::NotMainThread` if not called from the main thread
    /// - `Error::AlreadySubscribed` on a second call
    ///
    /// # References
    /// - [UNUserNotificationCenterDelegate](https://developer.apple.com/documentation/usernotifications/unusernotificationcenterdelegate)
    fn subscribe(&self) -> Result<mpsc::Receiver<AuthorityEvent>, Error> {
        let mtm = MainThreadMarker::new().ok_or(Error::NotMainThread)?;
        if self.inner.delegate_reference.get().is_some() {
            return Err(Error::AlreadySubscribed);
        }

        let (tx, rx) = mpsc::channel::<AuthorityEvent>(EVENT_CHANNEL_SIZE);
        let proto: Retained<ProtocolObject<dyn UNUserNotificationCenterDelegate>> =
            ProtocolObject::from_retained(NotificationDelegate::new(mtm, tx));

        unsafe {
            UNUserNotificationCenter::currentNotificationCenter().setDelegate(Some(&*proto));
        }

        // Store delegate reference to prevent deallocation
        self.inner
            .delegate_reference
            .set(proto)
            .map_err(|_| Error::AlreadySubscribed)?;

        Ok(rx)
    }
}
