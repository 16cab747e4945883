use crate::{AuthorityEvent, ResponseAction};
use objc2::{define_class, msg_send, rc::Retained, DefinedClass, MainThreadMarker, MainThreadOnly};
use objc2_foundation::{NSObject, NSObjectProtocol};
use objc2_user_notifications::{
    UNNotification, UNNotificationDefaultActionIdentifier, UNNotificationDismissActionIdentifier,
    UNNotificationPresentationOptions, UNNotificationResponse, UNUserNotificationCenter,
    UNUserNotificationCenterDelegate,
};
use tokio::sync::mpsc::Sender;

#[derive(Clone)]
pub struct Ivars {
    pub sender: Sender<AuthorityEvent>,
}

impl Ivars {
    fn forward(&self, event: AuthorityEvent) {
        if let Err(err) = self.sender.try_send(event) {
            log::error!("Failed to forward authority event: {err:?}");
        }
    }
}

define_class!(
    #[unsafe(super(NSObject))]
    #[ivars = Ivars]
    #[name = "PendingNotifyDelegate"]
    #[thread_kind = MainThreadOnly]
    pub struct NotificationDelegate;

    impl NotificationDelegate {}

    unsafe impl NSObjectProtocol for NotificationDelegate {}

    unsafe impl UNUserNotificationCenterDelegate for NotificationDelegate {
        // Required to show the banner while the app is in the foreground.
        // The notification just left the pending list, so the store must refresh.
        #[unsafe(method(userNotificationCenter:willPresentNotification:withCompletionHandler:))]
        fn will_present_notification(
            &self,
            _center: &UNUserNotificationCenter,
            notification: &UNNotification,
            completion_handler: &block2::Block<dyn Fn(UNNotificationPresentationOptions)>,
        ) {
            let identifier = unsafe { notification.request().identifier().to_string() };
            log::debug!("Will present notification {identifier}");
            self.ivars().forward(AuthorityEvent::WillPresent { identifier });

            let presentation_options = UNNotificationPresentationOptions::empty()
                .union(UNNotificationPresentationOptions::Banner)
                .union(UNNotificationPresentationOptions::Sound);
            completion_handler.call((presentation_options,));
        }

        #[unsafe(method(userNotificationCenter:didReceiveNotificationResponse:withCompletionHandler:))]
        unsafe fn did_receive_notification_response(
            &self,
            _center: &UNUserNotificationCenter,
            response: &UNNotificationResponse,
            completion_handler: &block2::Block<dyn Fn()>,
        ) {
            unsafe {
                let action_id = response.actionIdentifier();
                let action = match &*action_id {
                    a if a == UNNotificationDefaultActionIdentifier => ResponseAction::Default,
                    a if a == UNNotificationDismissActionIdentifier => ResponseAction::Dismiss,
                    _ => ResponseAction::Other(action_id.to_string()),
                };
                let identifier = response.notification().request().identifier().to_string();
                log::debug!("Did receive response {action:?} for {identifier}");

                self.ivars()
                    .forward(AuthorityEvent::Responded { identifier, action });
            }

            completion_handler.call(());
        }
    }
);

impl NotificationDelegate {
    pub fn new(mtm: MainThreadMarker, tx: Sender<AuthorityEvent>) -> Retained<Self> {
        let this = Self::alloc(mtm).set_ivars(Ivars { sender: tx });
        unsafe { msg_send![super(this), init] }
    }
}
