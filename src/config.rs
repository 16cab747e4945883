use std::ops::RangeInclusive;

use crate::{AuthorizationOptions, NotificationContent};

/// Where the user changes notification permission
#[cfg(target_os = "macos")]
pub const DEFAULT_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.preference.notifications";
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_SETTINGS_URL: &str = "app-settings:";

/// Delays the interval picker offers, in seconds
pub const DEFAULT_INTERVAL_RANGE: RangeInclusive<u64> = 1..=30;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) content: NotificationContent,
    pub(crate) interval_range: RangeInclusive<u64>,
    pub(crate) authorization: AuthorizationOptions,
    pub(crate) settings_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            content: NotificationContent::new()
                .title("Feed the cat")
                .body("It looks hangry")
                .sound("default"),
            interval_range: DEFAULT_INTERVAL_RANGE,
            authorization: AuthorizationOptions::default(),
            settings_url: DEFAULT_SETTINGS_URL.to_owned(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        SessionConfig::default()
    }

    /// Content used by `schedule_after` and `schedule_at`
    pub fn content(mut self, content: NotificationContent) -> Self {
        self.content = content;
        self
    }

    /// Interval delays accepted by `schedule_after`.
    /// The store itself takes any positive delay.
    pub fn interval_range(mut self, range: RangeInclusive<u64>) -> Self {
        self.interval_range = range;
        self
    }

    pub fn authorization(mut self, options: AuthorizationOptions) -> Self {
        self.authorization = options;
        self
    }

    pub fn settings_url(mut self, url: &str) -> Self {
        self.settings_url = url.to_owned();
        self
    }
}
