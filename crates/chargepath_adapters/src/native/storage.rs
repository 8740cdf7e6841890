//! Key-value storage through the `Preferences` plugin.

use std::rc::Rc;

use chargepath_platform::{
    storage_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BridgeError, CapabilitySubset, Platform, PlatformAdapter, PlatformError, PlatformErrorCode,
    StorageAdapter, STORAGE_PROBE_KEY,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{plugins::PREFERENCES, probe_plugin};
use crate::{
    bridge::is_quota_error,
    mapping::{decode, map_bridge_error, STORAGE_CODES},
    native_bridge::NativeBridge,
};

#[derive(Deserialize)]
struct GetResult {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct KeysResult {
    #[serde(default)]
    keys: Vec<String>,
}

/// Native storage adapter.
pub struct NativeStorageAdapter {
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    lifecycle: AdapterLifecycle,
}

impl NativeStorageAdapter {
    /// Creates an uninitialized adapter for `platform`.
    pub fn new(platform: Platform, bridge: Rc<dyn NativeBridge>) -> Self {
        Self {
            platform,
            bridge,
            lifecycle: AdapterLifecycle::new("storage", platform),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        probe_plugin(self.bridge.as_ref(), PREFERENCES)?;
        let trial = async {
            self.bridge
                .invoke(
                    PREFERENCES,
                    "set",
                    json!({"key": STORAGE_PROBE_KEY, "value": "1"}),
                )
                .await?;
            self.bridge
                .invoke(PREFERENCES, "remove", json!({"key": STORAGE_PROBE_KEY}))
                .await
        };
        trial
            .await
            .map(|_| ())
            .map_err(|e: BridgeError| format!("preferences trial write failed: {e}"))
    }

    async fn call(&self, method: &str, options: Value, key: Option<&str>) -> AdapterResult<Value> {
        self.lifecycle
            .require(PlatformErrorCode::StorageUnavailable, || self.probe())
            .await?;
        self.bridge
            .invoke(PREFERENCES, method, options)
            .await
            .map_err(|err| {
                if is_quota_error(&err) {
                    warn!(key = key.unwrap_or_default(), "native preferences are full");
                    return PlatformError::quota_exceeded(self.platform, err.message);
                }
                map_bridge_error(self.platform, &STORAGE_CODES, err)
            })
    }
}

impl std::fmt::Debug for NativeStorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeStorageAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for NativeStorageAdapter {
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
        storage_capabilities(self.is_available())
    }
}

impl StorageAdapter for NativeStorageAdapter {
    fn get<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<Option<String>>> {
        Box::pin(async move {
            let raw = self.call("get", json!({ "key": key }), Some(key)).await?;
            if raw.is_null() {
                return Ok(None);
            }
            Ok(decode::<GetResult>(self.platform, raw)?.value)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.call("set", json!({ "key": key, "value": value }), Some(key))
                .await
                .map(|_| ())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.call("remove", json!({ "key": key }), Some(key))
                .await
                .map(|_| ())
        })
    }

    fn clear(&self) -> AdapterFuture<'_, AdapterResult<()>> {
        Box::pin(async move { self.call("clear", json!({}), None).await.map(|_| ()) })
    }

    fn keys(&self) -> AdapterFuture<'_, AdapterResult<Vec<String>>> {
        Box::pin(async move {
            let raw = self.call("keys", json!({}), None).await?;
            if raw.is_null() {
                return Ok(Vec::new());
            }
            Ok(decode::<KeysResult>(self.platform, raw)?.keys)
        })
    }
}

#[cfg(test)]
mod tests {
    use chargepath_platform::{load_json_with, FallbackAction};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::native_bridge::RecordingNativeBridge;

    fn adapter(bridge: &Rc<RecordingNativeBridge>) -> NativeStorageAdapter {
        NativeStorageAdapter::new(Platform::Ios, bridge.clone())
    }

    #[test]
    fn probe_writes_and_removes_the_trial_key() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[PREFERENCES]));
        let store = adapter(&bridge);

        assert_eq!(block_on(store.initialize()), AdapterState::Available);

        let methods: Vec<String> = bridge.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["set", "remove"]);
        assert_eq!(
            bridge.calls_to(PREFERENCES, "remove")[0].options,
            json!({"key": STORAGE_PROBE_KEY})
        );
    }

    #[test]
    fn get_decodes_value_and_missing_keys() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[PREFERENCES]));
        bridge.respond(PREFERENCES, "get", Ok(json!({"value": "{\"kw\":150}"})));
        bridge.respond(PREFERENCES, "get", Ok(json!({"value": null})));
        let store = adapter(&bridge);

        let parsed: Option<Value> =
            block_on(load_json_with(&store, "filters")).expect("stored json");
        let missing = block_on(store.get("absent")).expect("missing");

        assert_eq!(parsed, Some(json!({"kw": 150})));
        assert_eq!(missing, None);
    }

    #[test]
    fn keys_come_back_in_plugin_order() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[PREFERENCES]));
        bridge.respond(PREFERENCES, "keys", Ok(json!({"keys": ["b", "a"]})));
        let store = adapter(&bridge);

        assert_eq!(block_on(store.keys()).expect("keys"), vec!["b", "a"]);
    }

    #[test]
    fn full_preferences_store_reports_quota() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[PREFERENCES]));
        let store = adapter(&bridge);
        block_on(store.initialize());
        bridge.respond(
            PREFERENCES,
            "set",
            Err(BridgeError::new("Storage quota exceeded for suite")),
        );

        let err = block_on(store.set("tiles", "...")).expect_err("full");

        assert_eq!(err.code, PlatformErrorCode::StorageQuotaExceeded);
        assert_eq!(err.fallback, Some(FallbackAction::EvictStaleEntries));
    }

    #[test]
    fn missing_plugin_is_storage_unavailable() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[]));
        let store = adapter(&bridge);

        let err = block_on(store.get("a")).expect_err("unavailable");

        assert_eq!(err.code, PlatformErrorCode::StorageUnavailable);
        assert!(bridge.calls().is_empty());
    }
}
