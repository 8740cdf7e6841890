//! Platform detection with per-detector caching.

use std::{cell::Cell, rc::Rc};

use tracing::info;

use crate::{
    environment::{BrowserApi, HostEnvironment},
    platform::{Platform, PlatformCapabilities},
};

/// Classifies the runtime once and caches the platform and capability snapshot.
///
/// Caches live on the detector value, so two detectors never share state.
#[derive(Clone)]
pub struct PlatformDetector {
    env: Rc<dyn HostEnvironment>,
    platform_override: Option<Platform>,
    platform: Cell<Option<Platform>>,
    capabilities: Cell<Option<PlatformCapabilities>>,
}

impl std::fmt::Debug for PlatformDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformDetector")
            .field("platform_override", &self.platform_override)
            .field("platform", &self.platform.get())
            .field("capabilities", &self.capabilities.get())
            .finish_non_exhaustive()
    }
}

impl PlatformDetector {
    /// Creates a detector that probes `env`.
    pub fn new(env: Rc<dyn HostEnvironment>) -> Self {
        Self {
            env,
            platform_override: None,
            platform: Cell::new(None),
            capabilities: Cell::new(None),
        }
    }

    /// Creates a detector whose platform is pinned to `platform` instead of probed.
    ///
    /// A pinned platform also decides [`is_native`](Self::is_native); a pinned native platform
    /// reports every capability.
    pub fn with_override(env: Rc<dyn HostEnvironment>, platform: Option<Platform>) -> Self {
        Self {
            platform_override: platform,
            ..Self::new(env)
        }
    }

    /// Returns the probed environment.
    pub fn environment(&self) -> &Rc<dyn HostEnvironment> {
        &self.env
    }

    /// Returns whether a native-runtime bridge is present, or the pinned platform is native.
    ///
    /// Without a pinned platform this is always `false` when no window exists.
    pub fn is_native(&self) -> bool {
        match self.platform_override {
            Some(platform) => platform.is_native(),
            None => self.env.has_window() && self.env.has_native_bridge(),
        }
    }

    /// Returns whether the runtime is a plain web context.
    pub fn is_web(&self) -> bool {
        !self.is_native()
    }

    /// Returns the cached platform, probing the environment on first use.
    pub fn platform(&self) -> Platform {
        if let Some(platform) = self.platform.get() {
            return platform;
        }
        let platform = self.probe_platform();
        info!(platform = platform.as_str(), "platform resolved");
        self.platform.set(Some(platform));
        platform
    }

    fn probe_platform(&self) -> Platform {
        if let Some(platform) = self.platform_override {
            return platform;
        }
        if !self.is_native() {
            return Platform::Web;
        }
        if let Some(platform) = self
            .env
            .native_bridge_platform()
            .as_deref()
            .and_then(Platform::from_token)
        {
            return platform;
        }
        self.env
            .user_agent()
            .map(|ua| Platform::from_user_agent(&ua))
            .unwrap_or(Platform::Web)
    }

    /// Returns the cached capability snapshot, probing the environment on first use.
    pub fn capabilities(&self) -> PlatformCapabilities {
        if let Some(capabilities) = self.capabilities.get() {
            return capabilities;
        }
        let capabilities = self.probe_capabilities();
        self.capabilities.set(Some(capabilities));
        capabilities
    }

    fn probe_capabilities(&self) -> PlatformCapabilities {
        if self.is_native() {
            return PlatformCapabilities::all();
        }
        if !self.env.has_window() {
            return PlatformCapabilities::none();
        }
        let env = &self.env;
        PlatformCapabilities {
            has_camera: env.has_api(BrowserApi::MediaDevices),
            has_geolocation: env.has_api(BrowserApi::Geolocation),
            has_notifications: env.has_api(BrowserApi::Notification),
            has_storage: env.has_api(BrowserApi::LocalStorage),
            has_biometrics: false,
            has_app_state: env.has_api(BrowserApi::VisibilityState),
            has_network: env.has_api(BrowserApi::OnlineStatus),
            has_file_system: env.has_api(BrowserApi::FileSystemAccess),
        }
    }

    /// Clears the cached platform and capabilities.
    pub fn reset(&self) {
        self.platform.set(None);
        self.capabilities.set(None);
    }
}
