//! Local notifications through `LocalNotifications`, push registration through
//! `PushNotifications`.

use std::{cell::RefCell, rc::Rc};

use chargepath_platform::{
    notification_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BridgeError, CapabilitySubset, LocalNotification, NotificationAdapter, PermissionState,
    Platform, PlatformAdapter, PlatformError, PlatformErrorCode, PushRegistration,
};
use chrono::{DateTime, SecondsFormat};
use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{
    plugins::{LOCAL_NOTIFICATIONS, PUSH_NOTIFICATIONS},
    probe_plugin,
};
use crate::{
    mapping::{decode, encode, map_bridge_error, NOTIFICATION_CODES, PUSH_CODES},
    native_bridge::{BridgeListener, NativeBridge},
};

#[derive(Debug, Serialize)]
struct Schedule {
    at: String,
}

#[derive(Debug, Serialize)]
struct NativeNotification<'a> {
    id: i32,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule: Option<Schedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
struct ScheduleOptions<'a> {
    notifications: Vec<NativeNotification<'a>>,
}

#[derive(Debug, Deserialize)]
struct DisplayPermission {
    display: String,
}

#[derive(Debug, Deserialize)]
struct ReceivePermission {
    receive: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationToken {
    value: String,
}

type RegistrationSender = Rc<RefCell<Option<oneshot::Sender<Result<String, BridgeError>>>>>;

/// Native notification adapter.
pub struct NativeNotificationAdapter {
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    lifecycle: AdapterLifecycle,
}

impl NativeNotificationAdapter {
    /// Creates an uninitialized adapter for `platform`.
    pub fn new(platform: Platform, bridge: Rc<dyn NativeBridge>) -> Self {
        Self {
            platform,
            bridge,
            lifecycle: AdapterLifecycle::new("notifications", platform),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        probe_plugin(self.bridge.as_ref(), LOCAL_NOTIFICATIONS)
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::NotificationsUnsupported, || self.probe())
            .await
    }

    async fn local(&self, method: &str, options: Value) -> AdapterResult<Value> {
        self.bridge
            .invoke(LOCAL_NOTIFICATIONS, method, options)
            .await
            .map_err(|e| map_bridge_error(self.platform, &NOTIFICATION_CODES, e))
    }

    async fn push(&self, method: &str, options: Value) -> AdapterResult<Value> {
        self.bridge
            .invoke(PUSH_NOTIFICATIONS, method, options)
            .await
            .map_err(|e| map_bridge_error(self.platform, &PUSH_CODES, e))
    }

    fn display_permission(&self, raw: Value) -> AdapterResult<PermissionState> {
        let permission: DisplayPermission = decode(self.platform, raw)?;
        Ok(PermissionState::from_token(&permission.display))
    }

    fn registration_listener(sender: &RegistrationSender, succeeded: bool) -> BridgeListener {
        let sender = sender.clone();
        Rc::new(move |event: Result<Value, BridgeError>| {
            let outcome = event.and_then(|payload| {
                if succeeded {
                    serde_json::from_value::<RegistrationToken>(payload)
                        .map(|token| token.value)
                        .map_err(|e| BridgeError::new(format!("malformed registration: {e}")))
                } else {
                    let detail = payload
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("push registration failed")
                        .to_string();
                    Err(BridgeError::new(detail))
                }
            });
            if let Some(tx) = sender.borrow_mut().take() {
                let _ = tx.send(outcome);
            }
        })
    }

    async fn await_registration(&self) -> AdapterResult<String> {
        let (tx, rx) = oneshot::channel();
        let sender: RegistrationSender = Rc::new(RefCell::new(Some(tx)));
        let on_token = self
            .bridge
            .listen(
                PUSH_NOTIFICATIONS,
                "addListener",
                json!({"eventName": "registration"}),
                Self::registration_listener(&sender, true),
            )
            .await
            .map_err(|e| map_bridge_error(self.platform, &PUSH_CODES, e))?;
        let on_error = match self
            .bridge
            .listen(
                PUSH_NOTIFICATIONS,
                "addListener",
                json!({"eventName": "registrationError"}),
                Self::registration_listener(&sender, false),
            )
            .await
        {
            Ok(id) => id,
            Err(err) => {
                self.bridge.release(&on_token);
                return Err(map_bridge_error(self.platform, &PUSH_CODES, err));
            }
        };

        let outcome = match self.push("register", json!({})).await {
            Ok(_) => rx
                .await
                .unwrap_or_else(|_| {
                    Err(BridgeError::new("push registration listener was dropped"))
                })
                .map_err(|e| map_bridge_error(self.platform, &PUSH_CODES, e)),
            Err(err) => Err(err),
        };
        self.bridge.release(&on_token);
        self.bridge.release(&on_error);
        outcome
    }
}

impl std::fmt::Debug for NativeNotificationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeNotificationAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

fn schedule_at(platform: Platform, unix_ms: u64) -> AdapterResult<Schedule> {
    let at = i64::try_from(unix_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            PlatformError::new(
                platform,
                PlatformErrorCode::NotificationScheduleFailed,
                format!("schedule time {unix_ms} is out of range"),
            )
        })?;
    Ok(Schedule {
        at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

impl PlatformAdapter for NativeNotificationAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn initialize(&self) -> AdapterFuture<'_, AdapterState> {
        Box::pin(self.lifecycle.ensure(|| self.probe()))
    }

    fn state(&self) -> AdapterState {
        self.lifecycle.state()
    }

    fn capabilities(&self) -> CapabilitySubset {
        notification_capabilities(self.is_available())
    }
}

impl NotificationAdapter for NativeNotificationAdapter {
    fn request_permission(&self) -> AdapterFuture<'_, AdapterResult<PermissionState>> {
        Box::pin(async move {
            self.ready().await?;
            let raw = self.local("requestPermissions", json!({})).await?;
            self.display_permission(raw)
        })
    }

    fn schedule_local<'a>(
        &'a self,
        notification: &'a LocalNotification,
    ) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            let raw = self.local("checkPermissions", json!({})).await?;
            let permission = self.display_permission(raw)?;
            if !permission.is_granted() {
                return Err(PlatformError::permission_denied(
                    self.platform,
                    PlatformErrorCode::NotificationPermissionDenied,
                    format!("notification permission is {permission:?}"),
                ));
            }
            let schedule = notification
                .schedule_at_unix_ms
                .map(|at| schedule_at(self.platform, at))
                .transpose()?;
            let options = encode(
                self.platform,
                &ScheduleOptions {
                    notifications: vec![NativeNotification {
                        id: notification.id,
                        title: &notification.title,
                        body: &notification.body,
                        schedule,
                        extra: notification.extra.as_ref(),
                    }],
                },
            )?;
            self.local("schedule", options).await?;
            debug!(id = notification.id, "local notification scheduled");
            Ok(())
        })
    }

    fn cancel_local<'a>(&'a self, ids: &'a [i32]) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            if ids.is_empty() {
                return Ok(());
            }
            let notifications: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
            self.local("cancel", json!({ "notifications": notifications }))
                .await
                .map(|_| ())
        })
    }

    fn register_for_push(&self) -> AdapterFuture<'_, AdapterResult<PushRegistration>> {
        Box::pin(async move {
            self.ready().await?;
            probe_plugin(self.bridge.as_ref(), PUSH_NOTIFICATIONS).map_err(|reason| {
                PlatformError::new(self.platform, PlatformErrorCode::PushUnsupported, reason)
            })?;
            let raw = self.push("requestPermissions", json!({})).await?;
            let permission: ReceivePermission = decode(self.platform, raw)?;
            let permission = PermissionState::from_token(&permission.receive);
            if !permission.is_granted() {
                return Err(PlatformError::permission_denied(
                    self.platform,
                    PlatformErrorCode::NotificationPermissionDenied,
                    format!("push permission is {permission:?}"),
                ));
            }
            let token = self.await_registration().await?;
            info!(platform = self.platform.as_str(), "registered for push");
            Ok(PushRegistration { token })
        })
    }
}
