//! Platform classification and capability records.

use serde::{Deserialize, Serialize};

/// Runtime class the client is executing under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Plain browser context (or any context without a native bridge).
    Web,
    /// Native iOS shell.
    Ios,
    /// Native Android shell.
    Android,
}

impl Platform {
    /// Returns a stable string token for diagnostics and error tags.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// Returns whether this platform is served by native-runtime adapters.
    pub const fn is_native(self) -> bool {
        matches!(self, Self::Ios | Self::Android)
    }

    /// Parses a platform token as reported by a native bridge.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "web" => Some(Self::Web),
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            _ => None,
        }
    }

    /// Classifies a user-agent string.
    ///
    /// `iphone`/`ipad` map to [`Platform::Ios`], `android` to [`Platform::Android`], anything
    /// else to [`Platform::Web`].
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.contains("iphone") || ua.contains("ipad") {
            Self::Ios
        } else if ua.contains("android") {
            Self::Android
        } else {
            Self::Web
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device capability snapshot for the detected platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCapabilities {
    /// Camera capture is reachable.
    pub has_camera: bool,
    /// Location services are reachable.
    pub has_geolocation: bool,
    /// User-visible notifications can be shown.
    pub has_notifications: bool,
    /// Durable key/value storage is reachable.
    pub has_storage: bool,
    /// Biometric authentication is reachable.
    pub has_biometrics: bool,
    /// Foreground/background app-state changes are observable.
    pub has_app_state: bool,
    /// Network status is observable.
    pub has_network: bool,
    /// File-system access is reachable.
    pub has_file_system: bool,
}

impl PlatformCapabilities {
    /// Every capability present. Native runtimes report this posture.
    pub const fn all() -> Self {
        Self {
            has_camera: true,
            has_geolocation: true,
            has_notifications: true,
            has_storage: true,
            has_biometrics: true,
            has_app_state: true,
            has_network: true,
            has_file_system: true,
        }
    }

    /// No capability present. Used for contexts without a window.
    pub const fn none() -> Self {
        Self {
            has_camera: false,
            has_geolocation: false,
            has_notifications: false,
            has_storage: false,
            has_biometrics: false,
            has_app_state: false,
            has_network: false,
            has_file_system: false,
        }
    }
}

/// Partial capability record reported by a single adapter.
///
/// `None` means the adapter does not speak to that capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySubset {
    /// Camera capture.
    pub has_camera: Option<bool>,
    /// Location services.
    pub has_geolocation: Option<bool>,
    /// User-visible notifications.
    pub has_notifications: Option<bool>,
    /// Durable key/value storage.
    pub has_storage: Option<bool>,
    /// Biometric authentication.
    pub has_biometrics: Option<bool>,
    /// App foreground/background state.
    pub has_app_state: Option<bool>,
    /// Network status.
    pub has_network: Option<bool>,
    /// File-system access.
    pub has_file_system: Option<bool>,
}

impl CapabilitySubset {
    /// Overlays the flags this subset speaks to onto `base`.
    pub fn apply_to(self, mut base: PlatformCapabilities) -> PlatformCapabilities {
        let overlay = |slot: &mut bool, value: Option<bool>| {
            if let Some(value) = value {
                *slot = value;
            }
        };
        overlay(&mut base.has_camera, self.has_camera);
        overlay(&mut base.has_geolocation, self.has_geolocation);
        overlay(&mut base.has_notifications, self.has_notifications);
        overlay(&mut base.has_storage, self.has_storage);
        overlay(&mut base.has_biometrics, self.has_biometrics);
        overlay(&mut base.has_app_state, self.has_app_state);
        overlay(&mut base.has_network, self.has_network);
        overlay(&mut base.has_file_system, self.has_file_system);
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_sniffing_matches_mobile_markers() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        let ipad = "Mozilla/5.0 (iPad; CPU OS 16_4 like Mac OS X)";
        let pixel = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36";
        let desktop = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0";

        assert_eq!(Platform::from_user_agent(iphone), Platform::Ios);
        assert_eq!(Platform::from_user_agent(ipad), Platform::Ios);
        assert_eq!(Platform::from_user_agent(pixel), Platform::Android);
        assert_eq!(Platform::from_user_agent(desktop), Platform::Web);
    }

    #[test]
    fn bridge_tokens_are_case_insensitive() {
        assert_eq!(Platform::from_token(" iOS "), Some(Platform::Ios));
        assert_eq!(Platform::from_token("ANDROID"), Some(Platform::Android));
        assert_eq!(Platform::from_token("electron"), None);
    }

    #[test]
    fn subset_overlay_only_touches_reported_flags() {
        let subset = CapabilitySubset {
            has_storage: Some(false),
            ..CapabilitySubset::default()
        };
        let merged = subset.apply_to(PlatformCapabilities::all());
        assert!(!merged.has_storage);
        assert!(merged.has_camera);
    }

    #[test]
    fn platform_serializes_as_lowercase_token() {
        let json = serde_json::to_string(&Platform::Android).expect("serialize");
        assert_eq!(json, "\"android\"");
    }
}
