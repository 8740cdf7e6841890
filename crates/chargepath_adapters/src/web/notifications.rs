//! Notification API adapter. Push registration needs the native runtime.

use std::rc::Rc;

use chargepath_platform::{
    millis_until, notification_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult,
    AdapterState, BrowserApi, CapabilitySubset, HostEnvironment, LocalNotification,
    NotificationAdapter, PermissionState, Platform, PlatformAdapter, PlatformError,
    PlatformErrorCode, PushRegistration,
};
use tracing::debug;

use crate::{
    bridge,
    mapping::{map_bridge_error, NOTIFICATION_CODES},
};

/// Longest delay a browser timer honours. Larger values are clamped to zero and fire at once.
const MAX_TIMER_DELAY_MS: u64 = i32::MAX as u64;

/// Splits `delay_ms` into consecutive timer delays that each fit [`MAX_TIMER_DELAY_MS`].
fn timer_segments(delay_ms: u64) -> Vec<u32> {
    let mut segments = Vec::new();
    let mut remaining = delay_ms;
    while remaining > MAX_TIMER_DELAY_MS {
        segments.push(MAX_TIMER_DELAY_MS as u32);
        remaining -= MAX_TIMER_DELAY_MS;
    }
    segments.push(remaining as u32);
    segments
}

/// Browser notification adapter backed by the `Notification` global.
pub struct WebNotificationAdapter {
    env: Rc<dyn HostEnvironment>,
    lifecycle: AdapterLifecycle,
}

impl WebNotificationAdapter {
    /// Creates an uninitialized adapter probing `env`.
    pub fn new(env: Rc<dyn HostEnvironment>) -> Self {
        Self {
            env,
            lifecycle: AdapterLifecycle::new("notifications", Platform::Web),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        if self.env.has_api(BrowserApi::Notification) {
            Ok(())
        } else {
            Err("Notification API is not available".to_string())
        }
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::NotificationsUnsupported, || self.probe())
            .await
    }
}

impl std::fmt::Debug for WebNotificationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebNotificationAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for WebNotificationAdapter {
    fn platform(&self) -> Platform {
        Platform::Web
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

impl NotificationAdapter for WebNotificationAdapter {
    fn request_permission(&self) -> AdapterFuture<'_, AdapterResult<PermissionState>> {
        Box::pin(async move {
            self.ready().await?;
            let token = bridge::notification_request_permission()
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &NOTIFICATION_CODES, e))?;
            Ok(PermissionState::from_token(&token))
        })
    }

    fn schedule_local<'a>(
        &'a self,
        notification: &'a LocalNotification,
    ) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            let token = bridge::notification_permission()
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &NOTIFICATION_CODES, e))?;
            if !PermissionState::from_token(&token).is_granted() {
                return Err(PlatformError::permission_denied(
                    Platform::Web,
                    PlatformErrorCode::NotificationPermissionDenied,
                    format!("notification permission is {token}"),
                ));
            }

            let delay_ms = notification
                .schedule_at_unix_ms
                .map(millis_until)
                .unwrap_or_default();
            debug!(id = notification.id, delay_ms, "scheduling browser notification");
            let outcome = if delay_ms > 0 {
                bridge::notification_schedule(
                    notification.id,
                    &timer_segments(delay_ms),
                    &notification.title,
                    &notification.body,
                )
                .await
            } else {
                bridge::notification_show(notification.id, &notification.title, &notification.body)
                    .await
            };
            outcome.map_err(|e| map_bridge_error(Platform::Web, &NOTIFICATION_CODES, e))
        })
    }

    fn cancel_local<'a>(&'a self, ids: &'a [i32]) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            for id in ids {
                bridge::notification_cancel(*id)
                    .await
                    .map_err(|e| map_bridge_error(Platform::Web, &NOTIFICATION_CODES, e))?;
            }
            Ok(())
        })
    }

    fn register_for_push(&self) -> AdapterFuture<'_, AdapterResult<PushRegistration>> {
        Box::pin(async move {
            self.ready().await?;
            Err(PlatformError::new(
                Platform::Web,
                PlatformErrorCode::PushUnsupported,
                "push registration requires the native runtime",
            ))
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chargepath_platform::StaticEnvironment;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_notification_global_is_unsupported() {
        let adapter = WebNotificationAdapter::new(Rc::new(
            StaticEnvironment::full_browser().without_api(BrowserApi::Notification),
        ));

        assert_eq!(
            block_on(adapter.initialize()),
            AdapterState::Unavailable("Notification API is not available".to_string())
        );
        let err = block_on(adapter.request_permission()).expect_err("unsupported");
        assert_eq!(err.code, PlatformErrorCode::NotificationsUnsupported);
        assert_eq!(adapter.capabilities().has_notifications, Some(false));
    }

    #[test]
    fn short_delays_use_a_single_timer() {
        assert_eq!(timer_segments(90_000), vec![90_000]);
        assert_eq!(timer_segments(MAX_TIMER_DELAY_MS), vec![i32::MAX as u32]);
    }

    #[test]
    fn delays_beyond_the_browser_timer_range_are_rearmed() {
        let forty_days_ms = 40 * 24 * 60 * 60 * 1_000;

        let segments = timer_segments(forty_days_ms);

        assert_eq!(segments, vec![i32::MAX as u32, 1_308_516_353]);
        assert!(segments.iter().all(|&ms| u64::from(ms) <= MAX_TIMER_DELAY_MS));
        assert_eq!(
            segments.iter().map(|&ms| u64::from(ms)).sum::<u64>(),
            forty_days_ms
        );
    }

    #[test]
    fn push_is_unsupported_on_web() {
        let adapter = WebNotificationAdapter::new(Rc::new(StaticEnvironment::full_browser()));

        let err = block_on(adapter.register_for_push()).expect_err("push");

        assert_eq!(err.code, PlatformErrorCode::PushUnsupported);
        assert!(adapter.is_available());
    }
}
