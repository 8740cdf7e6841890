//! Browser implementations of the capability contracts.

mod camera;
mod device;
mod geolocation;
mod http;
mod notifications;
mod storage;

use std::rc::Rc;

use chargepath_platform::{HostEnvironment, Platform, PlatformConfig};

pub use camera::WebCameraAdapter;
pub use device::{WebDeviceAdapter, DEVICE_ID_KEY};
pub use geolocation::WebGeolocationAdapter;
pub use http::WebHttpAdapter;
pub use notifications::WebNotificationAdapter;
pub use storage::WebStorageAdapter;

use crate::registry::AdapterRegistry;

/// Builds uninitialized browser adapters probing `env`.
pub fn build_adapters(env: Rc<dyn HostEnvironment>, config: &PlatformConfig) -> AdapterRegistry {
    AdapterRegistry::new(
        Platform::Web,
        Rc::new(WebStorageAdapter::new(env.clone())),
        Rc::new(WebHttpAdapter::new(env.clone(), config.http.clone())),
        Rc::new(WebNotificationAdapter::new(env.clone())),
        Rc::new(WebGeolocationAdapter::new(env.clone())),
        Rc::new(WebCameraAdapter::new(env.clone())),
        Rc::new(WebDeviceAdapter::new(env)),
    )
}

/// Builds the browser registry and initializes every adapter concurrently.
pub async fn build_registry(
    env: Rc<dyn HostEnvironment>,
    config: &PlatformConfig,
) -> AdapterRegistry {
    let registry = build_adapters(env, config);
    registry.initialize_all().await;
    registry
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chargepath_platform::{AdapterState, BrowserApi, StaticEnvironment};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_browser_initializes_each_adapter_independently() {
        let env = Rc::new(StaticEnvironment::browser_with(&[
            BrowserApi::LocalStorage,
            BrowserApi::Geolocation,
        ]));

        let registry = block_on(build_registry(env, &PlatformConfig::default()));
        let states = registry.states();

        assert_eq!(registry.platform(), Platform::Web);
        assert_eq!(states[0], ("storage", AdapterState::Available));
        assert!(matches!(states[1], ("http", AdapterState::Unavailable(_))));
        assert!(matches!(
            states[2],
            ("notifications", AdapterState::Unavailable(_))
        ));
        assert_eq!(states[3], ("geolocation", AdapterState::Available));
        assert!(matches!(states[4], ("camera", AdapterState::Unavailable(_))));
        assert_eq!(states[5], ("device", AdapterState::Available));
    }
}
