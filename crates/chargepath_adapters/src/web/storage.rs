//! `localStorage`-backed key-value storage.

use std::rc::Rc;

use chargepath_platform::{
    storage_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BridgeError, BrowserApi, CapabilitySubset, HostEnvironment, Platform, PlatformAdapter,
    PlatformError, PlatformErrorCode, StorageAdapter, STORAGE_PROBE_KEY,
};
use tracing::warn;

use crate::{
    bridge,
    mapping::{map_bridge_error, STORAGE_CODES},
};

/// Browser storage adapter backed by `window.localStorage`.
pub struct WebStorageAdapter {
    env: Rc<dyn HostEnvironment>,
    lifecycle: AdapterLifecycle,
}

impl WebStorageAdapter {
    /// Creates an uninitialized adapter probing `env`.
    pub fn new(env: Rc<dyn HostEnvironment>) -> Self {
        Self {
            env,
            lifecycle: AdapterLifecycle::new("storage", Platform::Web),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        if !self.env.has_api(BrowserApi::LocalStorage) {
            return Err("localStorage is not available".to_string());
        }
        bridge::storage_probe(STORAGE_PROBE_KEY)
            .await
            .map_err(|e| format!("localStorage trial write failed: {e}"))
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::StorageUnavailable, || self.probe())
            .await
    }
}

impl std::fmt::Debug for WebStorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebStorageAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

fn storage_error(key: Option<&str>, err: BridgeError) -> PlatformError {
    if bridge::is_quota_error(&err) {
        warn!(key = key.unwrap_or_default(), "localStorage quota exceeded");
        return PlatformError::quota_exceeded(Platform::Web, err.message);
    }
    map_bridge_error(Platform::Web, &STORAGE_CODES, err)
}

impl PlatformAdapter for WebStorageAdapter {
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
        storage_capabilities(self.is_available())
    }
}

impl StorageAdapter for WebStorageAdapter {
    fn get<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<Option<String>>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::storage_get(key)
                .await
                .map_err(|e| storage_error(Some(key), e))
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::storage_set(key, value)
                .await
                .map_err(|e| storage_error(Some(key), e))
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::storage_remove(key)
                .await
                .map_err(|e| storage_error(Some(key), e))
        })
    }

    fn clear(&self) -> AdapterFuture<'_, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::storage_clear()
                .await
                .map_err(|e| storage_error(None, e))
        })
    }

    fn keys(&self) -> AdapterFuture<'_, AdapterResult<Vec<String>>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::storage_keys()
                .await
                .map_err(|e| storage_error(None, e))
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chargepath_platform::{
        load_json_with, save_json_with, FallbackAction, StaticEnvironment,
    };
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bridge::WEB_STORAGE_QUOTA_BYTES;

    fn adapter(env: StaticEnvironment) -> WebStorageAdapter {
        block_on(bridge::storage_clear()).expect("reset shim");
        WebStorageAdapter::new(Rc::new(env))
    }

    #[test]
    fn probe_leaves_no_trace_and_values_round_trip() {
        let store = adapter(StaticEnvironment::full_browser());

        assert_eq!(block_on(store.initialize()), AdapterState::Available);
        assert_eq!(block_on(store.keys()).expect("keys"), Vec::<String>::new());

        block_on(save_json_with(&store, "vehicle", &serde_json::json!({"rangeKm": 410})))
            .expect("save");
        let loaded: serde_json::Value =
            block_on(load_json_with(&store, "vehicle")).expect("load").expect("present");
        assert_eq!(loaded["rangeKm"], 410);
        assert_eq!(store.capabilities().has_storage, Some(true));
    }

    #[test]
    fn missing_local_storage_is_unavailable() {
        let store = adapter(
            StaticEnvironment::full_browser().without_api(BrowserApi::LocalStorage),
        );

        assert!(matches!(
            block_on(store.initialize()),
            AdapterState::Unavailable(_)
        ));
        let err = block_on(store.get("vehicle")).expect_err("unavailable");
        assert_eq!(err.code, PlatformErrorCode::StorageUnavailable);
    }

    #[test]
    fn quota_exhaustion_is_recoverable_with_eviction_hint() {
        let store = adapter(StaticEnvironment::full_browser());
        let tiles = "t".repeat(WEB_STORAGE_QUOTA_BYTES);

        let err = block_on(store.set("map.tiles", &tiles)).expect_err("quota");

        assert_eq!(err.code, PlatformErrorCode::StorageQuotaExceeded);
        assert!(err.recoverable);
        assert_eq!(err.fallback, Some(FallbackAction::EvictStaleEntries));
    }
}
