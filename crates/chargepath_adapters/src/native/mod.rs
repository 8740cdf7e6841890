//! Native-runtime implementations of the capability contracts.
//!
//! Each adapter is a thin translation between a capability contract and one bridge plugin.

mod camera;
mod device;
mod geolocation;
mod http;
mod notifications;
mod storage;

use std::rc::Rc;

use chargepath_platform::{Platform, PlatformConfig};

pub use camera::NativeCameraAdapter;
pub use device::NativeDeviceAdapter;
pub use geolocation::NativeGeolocationAdapter;
pub use http::NativeHttpAdapter;
pub use notifications::NativeNotificationAdapter;
pub use storage::NativeStorageAdapter;

use crate::{native_bridge::NativeBridge, registry::AdapterRegistry};

/// Bridge plugin names used by the native adapters.
pub mod plugins {
    /// Key-value preferences.
    pub const PREFERENCES: &str = "Preferences";
    /// Native HTTP client.
    pub const HTTP: &str = "CapacitorHttp";
    /// Scheduled and immediate local notifications.
    pub const LOCAL_NOTIFICATIONS: &str = "LocalNotifications";
    /// Remote push registration.
    pub const PUSH_NOTIFICATIONS: &str = "PushNotifications";
    /// Position fixes and watches.
    pub const GEOLOCATION: &str = "Geolocation";
    /// Photo capture and library picking.
    pub const CAMERA: &str = "Camera";
    /// Device description, battery, and installation id.
    pub const DEVICE: &str = "Device";
    /// Connectivity status.
    pub const NETWORK: &str = "Network";

    /// Every plugin a fully equipped native shell registers.
    pub const ALL: [&str; 8] = [
        PREFERENCES,
        HTTP,
        LOCAL_NOTIFICATIONS,
        PUSH_NOTIFICATIONS,
        GEOLOCATION,
        CAMERA,
        DEVICE,
        NETWORK,
    ];
}

/// Availability probe shared by native adapters: runtime present and plugin registered.
pub(crate) fn probe_plugin(bridge: &dyn NativeBridge, plugin: &str) -> Result<(), String> {
    if !bridge.is_available() {
        return Err("native runtime bridge is not present".to_string());
    }
    if !bridge.is_plugin_available(plugin) {
        return Err(format!("{plugin} plugin is not registered"));
    }
    Ok(())
}

/// Builds uninitialized native adapters for `platform` talking through `bridge`.
pub fn build_adapters(
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    config: &PlatformConfig,
) -> AdapterRegistry {
    AdapterRegistry::new(
        platform,
        Rc::new(NativeStorageAdapter::new(platform, bridge.clone())),
        Rc::new(NativeHttpAdapter::new(
            platform,
            bridge.clone(),
            config.http.clone(),
        )),
        Rc::new(NativeNotificationAdapter::new(platform, bridge.clone())),
        Rc::new(NativeGeolocationAdapter::new(platform, bridge.clone())),
        Rc::new(NativeCameraAdapter::new(platform, bridge.clone())),
        Rc::new(NativeDeviceAdapter::new(platform, bridge)),
    )
}

/// Builds the native registry and initializes every adapter concurrently.
pub async fn build_registry(
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    config: &PlatformConfig,
) -> AdapterRegistry {
    let registry = build_adapters(platform, bridge, config);
    registry.initialize_all().await;
    registry
}

#[cfg(test)]
mod tests {
    use chargepath_platform::AdapterState;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::native_bridge::RecordingNativeBridge;

    #[test]
    fn unregistered_plugins_leave_only_their_adapter_unavailable() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[
            plugins::PREFERENCES,
            plugins::DEVICE,
        ]));

        let registry = block_on(build_registry(
            Platform::Android,
            bridge,
            &PlatformConfig::default(),
        ));
        let states = registry.states();

        assert_eq!(registry.platform(), Platform::Android);
        assert_eq!(states[0], ("storage", AdapterState::Available));
        assert_eq!(
            states[4],
            (
                "camera",
                AdapterState::Unavailable("Camera plugin is not registered".to_string())
            )
        );
        assert_eq!(states[5], ("device", AdapterState::Available));
    }
}
