//! Device information from the user agent, Battery Status API, and `navigator.onLine`.

use std::{cell::RefCell, rc::Rc};

use chargepath_platform::{
    device_capabilities, parse_user_agent, AdapterFuture, AdapterLifecycle, AdapterResult,
    AdapterState, BatteryInfo, BrowserApi, CapabilitySubset, ConnectionType, DeviceAdapter,
    DeviceInfo, HostEnvironment, NetworkStatus, Platform, PlatformAdapter, PlatformErrorCode,
};
use tracing::{info, warn};

use crate::{
    bridge,
    mapping::{map_bridge_error, DEVICE_CODES},
};

/// `localStorage` key holding the generated installation id.
pub const DEVICE_ID_KEY: &str = "chargepath.device_id";

/// Browser device adapter.
pub struct WebDeviceAdapter {
    env: Rc<dyn HostEnvironment>,
    lifecycle: AdapterLifecycle,
    device_id: RefCell<Option<String>>,
}

impl WebDeviceAdapter {
    /// Creates an uninitialized adapter probing `env`.
    pub fn new(env: Rc<dyn HostEnvironment>) -> Self {
        Self {
            env,
            lifecycle: AdapterLifecycle::new("device", Platform::Web),
            device_id: RefCell::new(None),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        if self.env.has_window() {
            Ok(())
        } else {
            Err("no browser window".to_string())
        }
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::DeviceUnavailable, || self.probe())
            .await
    }

    async fn load_or_create_id(&self) -> String {
        match bridge::storage_get(DEVICE_ID_KEY).await {
            Ok(Some(existing)) if !existing.trim().is_empty() => return existing,
            Ok(_) => {}
            Err(err) => warn!(error = %err, "device id lookup failed"),
        }
        let generated = uuid::Uuid::new_v4().to_string();
        match bridge::storage_set(DEVICE_ID_KEY, &generated).await {
            Ok(()) => info!(device_id = generated.as_str(), "generated device id"),
            Err(err) => warn!(error = %err, "device id could not be persisted"),
        }
        generated
    }
}

impl std::fmt::Debug for WebDeviceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDeviceAdapter")
            .field("lifecycle", &self.lifecycle)
            .field("device_id", &self.device_id.borrow())
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for WebDeviceAdapter {
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
        device_capabilities(
            self.is_available(),
            self.env.has_api(BrowserApi::OnlineStatus),
        )
    }
}

impl DeviceAdapter for WebDeviceAdapter {
    fn info(&self) -> AdapterFuture<'_, AdapterResult<DeviceInfo>> {
        Box::pin(async move {
            self.ready().await?;
            let details = parse_user_agent(&self.env.user_agent().unwrap_or_default());
            Ok(DeviceInfo {
                platform: Platform::Web,
                operating_system: details.operating_system,
                os_version: details.os_version,
                model: details.model,
                manufacturer: details.manufacturer,
                is_virtual: false,
                web_view_version: None,
            })
        })
    }

    fn battery(&self) -> AdapterFuture<'_, AdapterResult<BatteryInfo>> {
        Box::pin(async move {
            self.ready().await?;
            if !self.env.has_api(BrowserApi::Battery) {
                return Ok(BatteryInfo::default());
            }
            bridge::device_battery()
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &DEVICE_CODES, e))
        })
    }

    fn network_status(&self) -> AdapterFuture<'_, AdapterResult<NetworkStatus>> {
        Box::pin(async move {
            self.ready().await?;
            if !self.env.has_api(BrowserApi::OnlineStatus) {
                return Ok(NetworkStatus {
                    connected: true,
                    connection_type: ConnectionType::Unknown,
                });
            }
            bridge::device_network()
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &DEVICE_CODES, e))
        })
    }

    fn device_id(&self) -> AdapterFuture<'_, AdapterResult<String>> {
        Box::pin(async move {
            self.ready().await?;
            if let Some(id) = self.device_id.borrow().clone() {
                return Ok(id);
            }
            let id = self.load_or_create_id().await;
            *self.device_id.borrow_mut() = Some(id.clone());
            Ok(id)
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chargepath_platform::{OperatingSystem, StaticEnvironment};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    const PIXEL_UA: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8 Build/UQ1A) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Mobile Safari/537.36";

    fn browser() -> Rc<StaticEnvironment> {
        Rc::new(
            StaticEnvironment::full_browser()
                .with_user_agent(PIXEL_UA)
                .without_api(BrowserApi::Battery)
                .without_api(BrowserApi::OnlineStatus),
        )
    }

    #[test]
    fn info_is_derived_from_user_agent() {
        let adapter = WebDeviceAdapter::new(browser());

        let info = block_on(adapter.info()).expect("info");

        assert_eq!(info.platform, Platform::Web);
        assert_eq!(info.operating_system, OperatingSystem::Android);
        assert_eq!(info.os_version.as_deref(), Some("14"));
        assert!(!info.is_virtual);
    }

    #[test]
    fn missing_battery_and_online_apis_degrade_to_unknowns() {
        let adapter = WebDeviceAdapter::new(browser());

        assert_eq!(block_on(adapter.battery()).expect("battery"), BatteryInfo::default());
        assert_eq!(
            block_on(adapter.network_status()).expect("network"),
            NetworkStatus {
                connected: true,
                connection_type: ConnectionType::Unknown,
            }
        );
        assert_eq!(adapter.capabilities().has_network, Some(false));
    }

    #[test]
    fn device_id_is_generated_once_and_persisted() {
        block_on(bridge::storage_clear()).expect("reset shim");
        let first = WebDeviceAdapter::new(browser());
        let second = WebDeviceAdapter::new(browser());

        let id = block_on(first.device_id()).expect("id");
        let again = block_on(first.device_id()).expect("cached id");
        let from_storage = block_on(second.device_id()).expect("persisted id");

        assert_eq!(id.len(), 36);
        assert_eq!(again, id);
        assert_eq!(from_storage, id);
    }

    #[test]
    fn headless_host_has_no_device_adapter() {
        let adapter = WebDeviceAdapter::new(Rc::new(StaticEnvironment::headless()));

        let err = block_on(adapter.device_id()).expect_err("unavailable");

        assert_eq!(err.code, PlatformErrorCode::DeviceUnavailable);
    }
}
