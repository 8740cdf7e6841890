//! Device information contract and user-agent parsing.

use serde::{Deserialize, Serialize};

use crate::{
    adapter::{AdapterFuture, AdapterResult, PlatformAdapter},
    platform::{CapabilitySubset, Platform},
};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    /// Apple iOS or iPadOS.
    Ios,
    /// Android.
    Android,
    /// Microsoft Windows.
    Windows,
    /// macOS.
    Mac,
    /// Linux desktop.
    Linux,
    /// Not recognized.
    Unknown,
}

impl OperatingSystem {
    /// Parses an operating-system token as reported by native device APIs.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "ios" => Self::Ios,
            "android" => Self::Android,
            "windows" => Self::Windows,
            "mac" | "macos" => Self::Mac,
            "linux" => Self::Linux,
            _ => Self::Unknown,
        }
    }
}

/// Static device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Platform the client runs on.
    pub platform: Platform,
    /// Operating-system family.
    pub operating_system: OperatingSystem,
    /// Operating-system version, when known.
    pub os_version: Option<String>,
    /// Device model identifier.
    pub model: String,
    /// Device manufacturer.
    pub manufacturer: String,
    /// Running in a simulator or emulator.
    pub is_virtual: bool,
    /// Web view engine version, when known.
    pub web_view_version: Option<String>,
}

/// Battery snapshot. Fields are `None` when the host does not expose them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInfo {
    /// Charge level in `0.0..=1.0`.
    pub battery_level: Option<f64>,
    /// Whether the device is charging.
    pub is_charging: Option<bool>,
}

/// Network link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Wi-Fi or wired link.
    Wifi,
    /// Mobile data link.
    Cellular,
    /// No connectivity.
    None,
    /// Link type not reported.
    Unknown,
}

impl ConnectionType {
    /// Parses connection tokens from native network APIs and the browser Network Information API.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "wifi" | "ethernet" => Self::Wifi,
            "cellular" | "2g" | "3g" | "4g" | "5g" | "slow-2g" => Self::Cellular,
            "none" => Self::None,
            _ => Self::Unknown,
        }
    }
}

/// Network snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Whether any network link is up.
    pub connected: bool,
    /// Active link type.
    pub connection_type: ConnectionType,
}

/// Device information capability.
pub trait DeviceAdapter: PlatformAdapter {
    /// Describes the device.
    fn info(&self) -> AdapterFuture<'_, AdapterResult<DeviceInfo>>;

    /// Reads the battery state.
    fn battery(&self) -> AdapterFuture<'_, AdapterResult<BatteryInfo>>;

    /// Reads the network state.
    fn network_status(&self) -> AdapterFuture<'_, AdapterResult<NetworkStatus>>;

    /// Returns a stable per-installation identifier.
    fn device_id(&self) -> AdapterFuture<'_, AdapterResult<String>>;
}

/// Device capability flags shared by device adapters.
pub fn device_capabilities(available: bool, network: bool) -> CapabilitySubset {
    CapabilitySubset {
        has_app_state: Some(available),
        has_network: Some(available && network),
        ..CapabilitySubset::default()
    }
}

/// Fields extracted from a browser user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentDetails {
    /// Operating-system family.
    pub operating_system: OperatingSystem,
    /// Operating-system version, dotted.
    pub os_version: Option<String>,
    /// Device model, or the browser family on desktop.
    pub model: String,
    /// Vendor inferred from the model.
    pub manufacturer: String,
}

/// Extracts operating system, version, and model from a user-agent string.
///
/// Versions are normalized to dotted form (`17_2` becomes `17.2`).
pub fn parse_user_agent(user_agent: &str) -> UserAgentDetails {
    let ua = user_agent;
    let lower = ua.to_ascii_lowercase();

    if lower.contains("iphone") || lower.contains("ipad") {
        let model = if lower.contains("ipad") { "iPad" } else { "iPhone" };
        return UserAgentDetails {
            operating_system: OperatingSystem::Ios,
            os_version: version_after(ua, "OS ").map(|v| v.replace('_', ".")),
            model: model.to_string(),
            manufacturer: "Apple Inc.".to_string(),
        };
    }
    if lower.contains("android") {
        let model = ua
            .split_once("Android")
            .and_then(|(_, rest)| rest.split(';').nth(1))
            .map(|segment| segment.split(')').next().unwrap_or(segment).trim().to_string())
            .filter(|segment| !segment.is_empty())
            .unwrap_or_else(|| "Android".to_string());
        return UserAgentDetails {
            operating_system: OperatingSystem::Android,
            os_version: version_after(ua, "Android "),
            model,
            manufacturer: String::new(),
        };
    }
    if lower.contains("windows") {
        return UserAgentDetails {
            operating_system: OperatingSystem::Windows,
            os_version: version_after(ua, "Windows NT "),
            model: "Windows".to_string(),
            manufacturer: String::new(),
        };
    }
    if lower.contains("mac os x") || lower.contains("macintosh") {
        return UserAgentDetails {
            operating_system: OperatingSystem::Mac,
            os_version: version_after(ua, "Mac OS X ").map(|v| v.replace('_', ".")),
            model: "Macintosh".to_string(),
            manufacturer: "Apple Inc.".to_string(),
        };
    }
    if lower.contains("linux") {
        return UserAgentDetails {
            operating_system: OperatingSystem::Linux,
            os_version: None,
            model: "Linux".to_string(),
            manufacturer: String::new(),
        };
    }
    UserAgentDetails {
        operating_system: OperatingSystem::Unknown,
        os_version: None,
        model: "Unknown".to_string(),
        manufacturer: String::new(),
    }
}

fn version_after(ua: &str, marker: &str) -> Option<String> {
    let (_, rest) = ua.split_once(marker)?;
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
        .collect();
    let version = version.trim_end_matches(['.', '_']).to_string();
    (!version.is_empty()).then_some(version)
}
