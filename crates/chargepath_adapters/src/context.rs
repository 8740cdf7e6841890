//! Explicit owner of platform detection and the adapter registry.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use chargepath_platform::{
    CameraAdapter, DeviceAdapter, GeolocationAdapter, HostEnvironment, HttpAdapter,
    NotificationAdapter, Platform, PlatformCapabilities, PlatformConfig, PlatformDetector,
    StorageAdapter,
};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, info};

use crate::{
    environment::BrowserEnvironment,
    native,
    native_bridge::{CapacitorBridge, NativeBridge},
    registry::AdapterRegistry,
    web,
};

type PendingRegistry = Shared<LocalBoxFuture<'static, Rc<AdapterRegistry>>>;

/// Detector, native bridge, configuration, and the registry built for the detected platform.
///
/// Callers hold a context instead of reaching for process-wide state. The registry is built at
/// most once per observed platform: concurrent first callers await the same in-flight build, and
/// a platform change (after [`PlatformDetector::reset`]) replaces it.
pub struct PlatformContext {
    detector: PlatformDetector,
    bridge: Rc<dyn NativeBridge>,
    config: PlatformConfig,
    slot: RefCell<Option<(Platform, PendingRegistry)>>,
    builds: Cell<u32>,
}

impl PlatformContext {
    /// Creates a context probing `env` and talking to native plugins through `bridge`.
    pub fn new(
        env: Rc<dyn HostEnvironment>,
        bridge: Rc<dyn NativeBridge>,
        config: PlatformConfig,
    ) -> Self {
        let detector = PlatformDetector::with_override(env, config.effective_platform_override());
        Self {
            detector,
            bridge,
            config,
            slot: RefCell::new(None),
            builds: Cell::new(0),
        }
    }

    /// Context for the running page: browser probe plus the Capacitor bridge.
    pub fn browser(config: PlatformConfig) -> Self {
        Self::new(
            Rc::new(BrowserEnvironment),
            Rc::new(CapacitorBridge::new()),
            config,
        )
    }

    /// The detector this context dispatches on.
    pub fn detector(&self) -> &PlatformDetector {
        &self.detector
    }

    /// Configuration the adapters were built with.
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Detected capability snapshot.
    pub fn capabilities(&self) -> PlatformCapabilities {
        self.detector.capabilities()
    }

    /// Number of registries built so far.
    pub fn registry_builds(&self) -> u32 {
        self.builds.get()
    }

    /// Returns the registry for the current platform, building and initializing it on first use.
    pub async fn registry(&self) -> Rc<AdapterRegistry> {
        let platform = self.detector.platform();
        let cached = self
            .slot
            .borrow()
            .as_ref()
            .filter(|(built_for, _)| *built_for == platform)
            .map(|(_, pending)| pending.clone());
        let pending = match cached {
            Some(pending) => pending,
            None => {
                if let Some((previous, _)) = self.slot.borrow().as_ref() {
                    info!(
                        from = previous.as_str(),
                        to = platform.as_str(),
                        "platform changed, rebuilding adapter registry"
                    );
                }
                let pending = self.build(platform).shared();
                *self.slot.borrow_mut() = Some((platform, pending.clone()));
                pending
            }
        };
        pending.await
    }

    fn build(&self, platform: Platform) -> LocalBoxFuture<'static, Rc<AdapterRegistry>> {
        self.builds.set(self.builds.get() + 1);
        debug!(platform = platform.as_str(), "building adapter registry");
        let env = self.detector.environment().clone();
        let bridge = self.bridge.clone();
        let config = self.config.clone();
        async move {
            let registry = match platform {
                Platform::Web => web::build_registry(env, &config).await,
                Platform::Ios | Platform::Android => {
                    native::build_registry(platform, bridge, &config).await
                }
            };
            Rc::new(registry)
        }
        .boxed_local()
    }

    /// Storage adapter for the current platform.
    pub async fn storage(&self) -> Rc<dyn StorageAdapter> {
        self.registry().await.storage()
    }

    /// HTTP adapter for the current platform.
    pub async fn http(&self) -> Rc<dyn HttpAdapter> {
        self.registry().await.http()
    }

    /// Notification adapter for the current platform.
    pub async fn notifications(&self) -> Rc<dyn NotificationAdapter> {
        self.registry().await.notifications()
    }

    /// Geolocation adapter for the current platform.
    pub async fn geolocation(&self) -> Rc<dyn GeolocationAdapter> {
        self.registry().await.geolocation()
    }

    /// Camera adapter for the current platform.
    pub async fn camera(&self) -> Rc<dyn CameraAdapter> {
        self.registry().await.camera()
    }

    /// Device adapter for the current platform.
    pub async fn device(&self) -> Rc<dyn DeviceAdapter> {
        self.registry().await.device()
    }

    /// Drops the registry and the detector caches.
    pub fn reset(&self) {
        self.slot.borrow_mut().take();
        self.detector.reset();
    }
}

impl std::fmt::Debug for PlatformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformContext")
            .field("detector", &self.detector)
            .field("config", &self.config)
            .field(
                "registry_platform",
                &self.slot.borrow().as_ref().map(|(platform, _)| *platform),
            )
            .field("builds", &self.builds.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chargepath_platform::{AdapterState, StaticEnvironment};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::native_bridge::RecordingNativeBridge;

    #[test]
    fn repeated_calls_reuse_the_registry() {
        let ctx = PlatformContext::new(
            Rc::new(StaticEnvironment::full_browser()),
            Rc::new(RecordingNativeBridge::default()),
            PlatformConfig::default(),
        );

        let first = block_on(ctx.registry());
        let second = block_on(ctx.registry());

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.platform(), Platform::Web);
        assert_eq!(ctx.registry_builds(), 1);
    }

    #[test]
    fn native_platform_dispatches_to_native_adapters() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&native::plugins::ALL));
        let ctx = PlatformContext::new(
            Rc::new(StaticEnvironment::native("android")),
            bridge,
            PlatformConfig::default(),
        );

        let registry = block_on(ctx.registry());

        assert_eq!(registry.platform(), Platform::Android);
        assert!(registry
            .states()
            .iter()
            .all(|(_, state)| *state == AdapterState::Available));
        assert_eq!(block_on(ctx.camera()).platform(), Platform::Android);
    }

    #[test]
    fn reset_forces_a_fresh_build() {
        let ctx = PlatformContext::new(
            Rc::new(StaticEnvironment::headless()),
            Rc::new(RecordingNativeBridge::default()),
            PlatformConfig::default(),
        );

        let before = block_on(ctx.registry());
        ctx.reset();
        let after = block_on(ctx.registry());

        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(ctx.registry_builds(), 2);
    }
}
