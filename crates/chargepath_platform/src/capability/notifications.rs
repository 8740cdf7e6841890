//! Local and push notification contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    adapter::{AdapterFuture, AdapterResult, PlatformAdapter},
    capability::PermissionState,
    platform::CapabilitySubset,
};

/// A notification shown by the device, now or at a scheduled time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalNotification {
    /// Caller-chosen id, used to cancel.
    pub id: i32,
    /// Notification title.
    pub title: String,
    /// Notification body. May be empty.
    pub body: String,
    /// Unix milliseconds at which to show the notification. `None` shows it immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_at_unix_ms: Option<u64>,
    /// Opaque payload delivered back on tap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl LocalNotification {
    /// Creates an immediate notification.
    pub fn new(id: i32, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            body: body.into(),
            schedule_at_unix_ms: None,
            extra: None,
        }
    }

    /// Schedules the notification at `unix_ms`.
    pub fn at(mut self, unix_ms: u64) -> Self {
        self.schedule_at_unix_ms = Some(unix_ms);
        self
    }

    /// Renders title and body as a single line for hosts that show one text field.
    pub fn rendered_text(&self) -> String {
        if self.body.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.body)
        }
    }
}

/// Push registration returned by [`NotificationAdapter::register_for_push`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRegistration {
    /// Device token to hand to the push backend.
    pub token: String,
}

/// Notification capability.
pub trait NotificationAdapter: PlatformAdapter {
    /// Asks the user for notification permission.
    fn request_permission(&self) -> AdapterFuture<'_, AdapterResult<PermissionState>>;

    /// Shows or schedules a local notification.
    fn schedule_local<'a>(
        &'a self,
        notification: &'a LocalNotification,
    ) -> AdapterFuture<'a, AdapterResult<()>>;

    /// Cancels pending local notifications by id. Unknown ids are ignored.
    fn cancel_local<'a>(&'a self, ids: &'a [i32]) -> AdapterFuture<'a, AdapterResult<()>>;

    /// Registers the device for remote push delivery.
    fn register_for_push(&self) -> AdapterFuture<'_, AdapterResult<PushRegistration>>;
}

/// Notification capability flags shared by notification adapters.
pub fn notification_capabilities(available: bool) -> CapabilitySubset {
    CapabilitySubset {
        has_notifications: Some(available),
        ..CapabilitySubset::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_omits_empty_body() {
        assert_eq!(
            LocalNotification::new(1, "Charging done", " ").rendered_text(),
            "Charging done"
        );
        assert_eq!(
            LocalNotification::new(2, "Charging done", "82% reached").rendered_text(),
            "Charging done: 82% reached"
        );
    }
}
