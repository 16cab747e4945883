pub use crate::{
    AuthorityEvent, AuthorizationState, CalendarMatch, Error, NotificationAuthority,
    NotificationContent, NotificationRequest, NotificationSession, PendingSnapshot, PendingStore,
    PermissionTracker, ScenePhase, SessionConfig, Trigger, UserNotificationCenter,
};
