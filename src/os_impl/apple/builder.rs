use std::time::Duration;

use objc2::rc::Retained;
use objc2_foundation::{NSDateComponents, NSString};
use objc2_user_notifications::{
    UNCalendarNotificationTrigger, UNMutableNotificationContent, UNNotificationRequest,
    UNNotificationSound, UNNotificationTrigger, UNTimeIntervalNotificationTrigger,
};

use crate::{CalendarMatch, NotificationRequest, Trigger};

/// Value of an unset `NSDateComponents` field (`NSDateComponentUndefined`)
const COMPONENT_UNDEFINED: isize = isize::MAX;

pub(super) fn build(request: &NotificationRequest) -> Retained<UNNotificationRequest> {
    let content: Retained<UNMutableNotificationContent> = unsafe {
        let content = UNMutableNotificationContent::new();
        content.setTitle(&NSString::from_str(&request.title));
        content.setBody(&NSString::from_str(&request.body));

        if let Some(subtitle) = &request.subtitle {
            content.setSubtitle(&NSString::from_str(subtitle));
        }

        if let Some(sound_name) = &request.sound {
            let sound = if sound_name == "default" {
                UNNotificationSound::defaultSound()
            } else {
                UNNotificationSound::soundNamed(&NSString::from_str(sound_name))
            };
            content.setSound(Some(&sound));
        }

        content
    };

    let trigger: Retained<UNNotificationTrigger> = match &request.trigger {
        Trigger::Interval(delay) => unsafe {
            Retained::into_super(
                UNTimeIntervalNotificationTrigger::triggerWithTimeInterval_repeats(
                    delay.as_secs_f64(),
                    false,
                ),
            )
        },
        Trigger::Calendar(components) => unsafe {
            Retained::into_super(
                UNCalendarNotificationTrigger::triggerWithDateMatchingComponents_repeats(
                    &date_components(components),
                    false,
                ),
            )
        },
    };

    unsafe {
        UNNotificationRequest::requestWithIdentifier_content_trigger(
            &NSString::from_str(&request.identifier),
            &content,
            Some(&*trigger),
        )
    }
}

/// Read a pending request back, `None` for triggers this crate never schedules
pub(super) fn parse(request: &UNNotificationRequest) -> Option<NotificationRequest> {
    unsafe {
        let identifier = request.identifier().to_string();
        let Some(native_trigger) = request.trigger() else {
            log::warn!("pending request {identifier} has no trigger, skipping");
            return None;
        };

        let trigger = if let Some(interval) =
            native_trigger.downcast_ref::<UNTimeIntervalNotificationTrigger>()
        {
            Trigger::Interval(Duration::try_from_secs_f64(interval.timeInterval()).ok()?)
        } else if let Some(calendar) =
            native_trigger.downcast_ref::<UNCalendarNotificationTrigger>()
        {
            let date = calendar.dateComponents();
            Trigger::Calendar(CalendarMatch {
                year: component(date.year()).and_then(|year| i32::try_from(year).ok()),
                month: component(date.month()),
                day: component(date.day()),
                hour: component(date.hour()),
                minute: component(date.minute()),
            })
        } else {
            log::warn!("pending request {identifier} has an unsupported trigger, skipping");
            return None;
        };

        let content = request.content();
        let subtitle = content.subtitle().to_string();

        Some(NotificationRequest {
            identifier,
            title: content.title().to_string(),
            body: content.body().to_string(),
            subtitle: (!subtitle.is_empty()).then_some(subtitle),
            // UNNotificationSound does not expose its file name
            sound: content.sound().map(|_| "default".to_owned()),
            trigger,
        })
    }
}

fn date_components(components: &CalendarMatch) -> Retained<NSDateComponents> {
    unsafe {
        let date = NSDateComponents::new();
        if let Some(year) = components.year {
            date.setYear(year as isize);
        }
        if let Some(month) = components.month {
            date.setMonth(month as isize);
        }
        if let Some(day) = components.day {
            date.setDay(day as isize);
        }
        if let Some(hour) = components.hour {
            date.setHour(hour as isize);
        }
        if let Some(minute) = components.minute {
            date.setMinute(minute as isize);
        }
        date
    }
}

fn component(value: isize) -> Option<u32> {
    if value == COMPONENT_UNDEFINED {
        None
    } else {
        u32::try_from(value).ok()
    }
}
