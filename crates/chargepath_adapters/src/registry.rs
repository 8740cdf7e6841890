//! The per-platform set of capability adapters.

use std::rc::Rc;

use chargepath_platform::{
    AdapterState, CameraAdapter, DeviceAdapter, GeolocationAdapter, HttpAdapter,
    NotificationAdapter, Platform, PlatformAdapter, PlatformCapabilities, StorageAdapter,
};
use tracing::info;

/// One adapter per capability, all built for the same platform.
///
/// Registries are immutable once built; a different platform gets a different registry.
#[derive(Clone)]
pub struct AdapterRegistry {
    platform: Platform,
    storage: Rc<dyn StorageAdapter>,
    http: Rc<dyn HttpAdapter>,
    notifications: Rc<dyn NotificationAdapter>,
    geolocation: Rc<dyn GeolocationAdapter>,
    camera: Rc<dyn CameraAdapter>,
    device: Rc<dyn DeviceAdapter>,
}

/// Resolved state of every adapter in a registry, by capability name.
pub type RegistryStates = [(&'static str, AdapterState); 6];

impl AdapterRegistry {
    /// Assembles a registry. Adapters are not initialized here; see
    /// [`AdapterRegistry::initialize_all`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: Platform,
        storage: Rc<dyn StorageAdapter>,
        http: Rc<dyn HttpAdapter>,
        notifications: Rc<dyn NotificationAdapter>,
        geolocation: Rc<dyn GeolocationAdapter>,
        camera: Rc<dyn CameraAdapter>,
        device: Rc<dyn DeviceAdapter>,
    ) -> Self {
        Self {
            platform,
            storage,
            http,
            notifications,
            geolocation,
            camera,
            device,
        }
    }

    /// Platform every adapter in this registry serves.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Key-value storage adapter.
    pub fn storage(&self) -> Rc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// HTTP adapter.
    pub fn http(&self) -> Rc<dyn HttpAdapter> {
        self.http.clone()
    }

    /// Local and push notification adapter.
    pub fn notifications(&self) -> Rc<dyn NotificationAdapter> {
        self.notifications.clone()
    }

    /// Geolocation adapter.
    pub fn geolocation(&self) -> Rc<dyn GeolocationAdapter> {
        self.geolocation.clone()
    }

    /// Camera adapter.
    pub fn camera(&self) -> Rc<dyn CameraAdapter> {
        self.camera.clone()
    }

    /// Device information adapter.
    pub fn device(&self) -> Rc<dyn DeviceAdapter> {
        self.device.clone()
    }

    /// Initializes all six adapters concurrently and returns their resolved states.
    ///
    /// One adapter being unavailable never affects the others.
    pub async fn initialize_all(&self) -> RegistryStates {
        let (storage, http, notifications, geolocation, camera, device) = futures::join!(
            self.storage.initialize(),
            self.http.initialize(),
            self.notifications.initialize(),
            self.geolocation.initialize(),
            self.camera.initialize(),
            self.device.initialize(),
        );
        let states = [
            ("storage", storage),
            ("http", http),
            ("notifications", notifications),
            ("geolocation", geolocation),
            ("camera", camera),
            ("device", device),
        ];
        let available = states.iter().filter(|(_, s)| s.is_available()).count();
        info!(
            platform = self.platform.as_str(),
            available,
            total = states.len(),
            "adapter registry initialized"
        );
        states
    }

    /// Current state of every adapter without probing.
    pub fn states(&self) -> RegistryStates {
        [
            ("storage", self.storage.state()),
            ("http", self.http.state()),
            ("notifications", self.notifications.state()),
            ("geolocation", self.geolocation.state()),
            ("camera", self.camera.state()),
            ("device", self.device.state()),
        ]
    }

    /// Capability flags reported by the adapters themselves, layered over `base`.
    pub fn capabilities(&self, base: PlatformCapabilities) -> PlatformCapabilities {
        [
            self.storage.capabilities(),
            self.http.capabilities(),
            self.notifications.capabilities(),
            self.geolocation.capabilities(),
            self.camera.capabilities(),
            self.device.capabilities(),
        ]
        .into_iter()
        .fold(base, |merged, subset| subset.apply_to(merged))
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("platform", &self.platform)
            .field("states", &self.states())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chargepath_platform::{MemoryStorageAdapter, StaticEnvironment};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::web;

    #[test]
    fn memory_storage_slots_into_a_web_registry() {
        let env: Rc<StaticEnvironment> = Rc::new(StaticEnvironment::headless());
        let base = web::build_adapters(env, &Default::default());
        let registry = AdapterRegistry::new(
            Platform::Web,
            Rc::new(MemoryStorageAdapter::default()),
            base.http(),
            base.notifications(),
            base.geolocation(),
            base.camera(),
            base.device(),
        );

        let states = block_on(registry.initialize_all());

        assert_eq!(states[0], ("storage", AdapterState::Available));
        assert!(states[1..].iter().all(|(_, state)| !state.is_available()));
        let caps = registry.capabilities(PlatformCapabilities::none());
        assert!(caps.has_storage);
        assert!(!caps.has_camera);
    }
}
