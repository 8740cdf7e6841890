//! Device information through the native `Device` and `Network` plugins.

use std::rc::Rc;

use chargepath_platform::{
    device_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BatteryInfo, CapabilitySubset, ConnectionType, DeviceAdapter, DeviceInfo, NetworkStatus,
    OperatingSystem, Platform, PlatformAdapter, PlatformErrorCode,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    plugins::{DEVICE, NETWORK},
    probe_plugin,
};
use crate::{
    mapping::{decode, map_bridge_error, DEVICE_CODES},
    native_bridge::NativeBridge,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeDeviceInfo {
    #[serde(default)]
    model: String,
    #[serde(default)]
    operating_system: String,
    #[serde(default)]
    os_version: Option<String>,
    #[serde(default)]
    manufacturer: String,
    #[serde(default)]
    is_virtual: bool,
    #[serde(default)]
    web_view_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NativeDeviceId {
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeNetworkStatus {
    connected: bool,
    connection_type: String,
}

/// Native device adapter.
pub struct NativeDeviceAdapter {
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    lifecycle: AdapterLifecycle,
}

impl NativeDeviceAdapter {
    /// Creates an uninitialized adapter for `platform`.
    pub fn new(platform: Platform, bridge: Rc<dyn NativeBridge>) -> Self {
        Self {
            platform,
            bridge,
            lifecycle: AdapterLifecycle::new("device", platform),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        probe_plugin(self.bridge.as_ref(), DEVICE)
    }

    async fn call(&self, plugin: &str, method: &str) -> AdapterResult<Value> {
        self.lifecycle
            .require(PlatformErrorCode::DeviceUnavailable, || self.probe())
            .await?;
        self.bridge
            .invoke(plugin, method, json!({}))
            .await
            .map_err(|e| map_bridge_error(self.platform, &DEVICE_CODES, e))
    }
}

impl std::fmt::Debug for NativeDeviceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeDeviceAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for NativeDeviceAdapter {
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
        device_capabilities(
            self.is_available(),
            self.bridge.is_plugin_available(NETWORK),
        )
    }
}

impl DeviceAdapter for NativeDeviceAdapter {
    fn info(&self) -> AdapterFuture<'_, AdapterResult<DeviceInfo>> {
        Box::pin(async move {
            let raw = self.call(DEVICE, "getInfo").await?;
            let native: NativeDeviceInfo = decode(self.platform, raw)?;
            Ok(DeviceInfo {
                platform: self.platform,
                operating_system: OperatingSystem::from_token(&native.operating_system),
                os_version: native.os_version,
                model: native.model,
                manufacturer: native.manufacturer,
                is_virtual: native.is_virtual,
                web_view_version: native.web_view_version,
            })
        })
    }

    fn battery(&self) -> AdapterFuture<'_, AdapterResult<BatteryInfo>> {
        Box::pin(async move {
            let raw = self.call(DEVICE, "getBatteryInfo").await?;
            if raw.is_null() {
                return Ok(BatteryInfo::default());
            }
            decode(self.platform, raw)
        })
    }

    fn network_status(&self) -> AdapterFuture<'_, AdapterResult<NetworkStatus>> {
        Box::pin(async move {
            let raw = self.call(NETWORK, "getStatus").await?;
            let native: NativeNetworkStatus = decode(self.platform, raw)?;
            Ok(NetworkStatus {
                connected: native.connected,
                connection_type: ConnectionType::from_token(&native.connection_type),
            })
        })
    }

    fn device_id(&self) -> AdapterFuture<'_, AdapterResult<String>> {
        Box::pin(async move {
            let raw = self.call(DEVICE, "getId").await?;
            Ok(decode::<NativeDeviceId>(self.platform, raw)?.identifier)
        })
    }
}
