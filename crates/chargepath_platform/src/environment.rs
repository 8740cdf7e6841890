//! Host environment probe contracts.
//!
//! The detector and the web adapters never touch browser globals directly. They ask a
//! [`HostEnvironment`] instead, which keeps detection deterministic in tests and lets
//! server-side/headless builds report "no window" without special cases.

use std::cell::Cell;

/// Browser API families the platform layer feature-detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserApi {
    /// `navigator.mediaDevices`.
    MediaDevices,
    /// `navigator.geolocation`.
    Geolocation,
    /// The `Notification` global.
    Notification,
    /// `document.visibilityState`.
    VisibilityState,
    /// `window.localStorage`.
    LocalStorage,
    /// `navigator.onLine`.
    OnlineStatus,
    /// The `fetch` global.
    Fetch,
    /// `window.showDirectoryPicker`.
    FileSystemAccess,
    /// `navigator.getBattery`.
    Battery,
}

impl BrowserApi {
    /// Every API family, in probe order.
    pub const ALL: [Self; 9] = [
        Self::MediaDevices,
        Self::Geolocation,
        Self::Notification,
        Self::VisibilityState,
        Self::LocalStorage,
        Self::OnlineStatus,
        Self::Fetch,
        Self::FileSystemAccess,
        Self::Battery,
    ];
}

/// Read-only view of the execution environment.
pub trait HostEnvironment {
    /// Returns whether a global `window` exists.
    fn has_window(&self) -> bool;

    /// Returns whether a native-runtime bridge is present and reports a native context.
    fn has_native_bridge(&self) -> bool;

    /// Returns the platform token reported by the native bridge, if it reports one.
    fn native_bridge_platform(&self) -> Option<String>;

    /// Returns the user-agent string, if a navigator exists.
    fn user_agent(&self) -> Option<String>;

    /// Returns whether a browser API family is present.
    fn has_api(&self, api: BrowserApi) -> bool;
}

/// Value-configured environment for headless contexts and tests.
///
/// `native_bridge_platform` calls are counted so callers can observe caching behavior.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    window: bool,
    native_bridge: bool,
    bridge_platform: Option<String>,
    user_agent: Option<String>,
    apis: Vec<BrowserApi>,
    bridge_platform_queries: Cell<u32>,
}

impl StaticEnvironment {
    /// Environment without a window, as seen during server-side rendering.
    pub fn headless() -> Self {
        Self::default()
    }

    /// Browser window exposing every API family in [`BrowserApi::ALL`].
    pub fn full_browser() -> Self {
        Self {
            window: true,
            apis: BrowserApi::ALL.to_vec(),
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64)".to_string()),
            ..Self::default()
        }
    }

    /// Browser window exposing only the listed API families.
    pub fn browser_with(apis: &[BrowserApi]) -> Self {
        Self {
            window: true,
            apis: apis.to_vec(),
            ..Self::default()
        }
    }

    /// Native shell whose bridge reports `platform`.
    pub fn native(platform: &str) -> Self {
        Self {
            window: true,
            native_bridge: true,
            bridge_platform: Some(platform.to_string()),
            ..Self::default()
        }
    }

    /// Native shell whose bridge does not report a platform, leaving detection to the user agent.
    pub fn native_without_platform(user_agent: &str) -> Self {
        Self {
            window: true,
            native_bridge: true,
            user_agent: Some(user_agent.to_string()),
            ..Self::default()
        }
    }

    /// Replaces the user-agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Removes an API family from the environment.
    pub fn without_api(mut self, api: BrowserApi) -> Self {
        self.apis.retain(|present| *present != api);
        self
    }

    /// Number of times the bridge platform was queried.
    pub fn bridge_platform_queries(&self) -> u32 {
        self.bridge_platform_queries.get()
    }
}

impl HostEnvironment for StaticEnvironment {
    fn has_window(&self) -> bool {
        self.window
    }

    fn has_native_bridge(&self) -> bool {
        self.window && self.native_bridge
    }

    fn native_bridge_platform(&self) -> Option<String> {
        self.bridge_platform_queries
            .set(self.bridge_platform_queries.get().saturating_add(1));
        self.bridge_platform.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn has_api(&self, api: BrowserApi) -> bool {
        self.window && self.apis.contains(&api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_environment_reports_nothing() {
        let env = StaticEnvironment::headless();
        assert!(!env.has_window());
        assert!(!env.has_native_bridge());
        assert!(BrowserApi::ALL.iter().all(|api| !env.has_api(*api)));
    }

    #[test]
    fn without_api_removes_only_that_family() {
        let env = StaticEnvironment::full_browser().without_api(BrowserApi::MediaDevices);
        assert!(!env.has_api(BrowserApi::MediaDevices));
        assert!(env.has_api(BrowserApi::Geolocation));
    }
}
