#[cfg(any(target_os = "macos", target_os = "ios"))]
mod apple;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use apple::UserNotificationCenter;

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
mod unsupported;
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub use unsupported::UserNotificationCenter;
