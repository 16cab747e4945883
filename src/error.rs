use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Apple errors
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    #[error("bundle id is not set, this is required to schedule notifications")]
    NoBundleId,
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    #[error("UserNotifications APIs need to be called from the main thread, but this is not the main thread")]
    NotMainThread,
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    #[error("NSError {code}: {description}")]
    NSError { code: isize, description: String },

    // Authority errors
    #[error("notifications are not authorized")]
    NotAuthorized,
    #[error("the notification authority rejected the request: {0}")]
    Rejected(String),
    #[error("authority events already have a subscriber")]
    AlreadySubscribed,
    #[error("notifications are not supported on this platform")]
    NotSupported,

    // Store and tracker errors
    #[error("permission request failed: {0}")]
    PermissionRequestFailed(#[source] Box<Error>),
    #[error("notification submission failed: {0}")]
    ScheduleSubmissionFailed(#[source] Box<Error>),
    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),
    #[error("interval of {seconds}s is outside the allowed range {min}..={max}")]
    IntervalOutOfRange { seconds: u64, min: u64, max: u64 },

    // Common errors
    #[error(transparent)]
    TokioRecv(#[from] tokio::sync::oneshot::error::RecvError),
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
    #[error("Other error: {0}")]
    Other(String),
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
impl From<&objc2_foundation::NSError> for Error {
    fn from(error: &objc2_foundation::NSError) -> Self {
        Error::NSError {
            code: error.code(),
            description: error.localizedDescription().to_string(),
        }
    }
}
