//! Key/value storage contract and in-memory adapter.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    adapter::{AdapterFuture, AdapterResult, AdapterState, PlatformAdapter},
    error::{PlatformError, PlatformErrorCode},
    platform::{CapabilitySubset, Platform},
};

/// Key used by storage adapters for their trial write during initialization.
pub const STORAGE_PROBE_KEY: &str = "__chargepath_storage_probe__";

/// Durable string key/value storage. Values are opaque strings chosen by callers.
pub trait StorageAdapter: PlatformAdapter {
    /// Reads the value stored under `key`.
    fn get<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<Option<String>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> AdapterFuture<'a, AdapterResult<()>>;

    /// Removes `key`. Removing a missing key succeeds.
    fn remove<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<()>>;

    /// Removes every key.
    fn clear(&self) -> AdapterFuture<'_, AdapterResult<()>>;

    /// Lists stored keys.
    fn keys(&self) -> AdapterFuture<'_, AdapterResult<Vec<String>>>;
}

/// Storage capability flags shared by storage adapters.
pub fn storage_capabilities(available: bool) -> CapabilitySubset {
    CapabilitySubset {
        has_storage: Some(available),
        ..CapabilitySubset::default()
    }
}

/// Loads and deserializes a JSON value through a [`StorageAdapter`].
///
/// # Errors
///
/// Returns the adapter error, or [`PlatformErrorCode::InvalidPayload`] when the stored text is
/// not valid JSON for `T`.
pub async fn load_json_with<S: StorageAdapter + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
) -> AdapterResult<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw).map(Some).map_err(|e| {
        PlatformError::new(store.platform(), PlatformErrorCode::InvalidPayload, e.to_string())
    })
}

/// Serializes and stores a JSON value through a [`StorageAdapter`].
///
/// # Errors
///
/// Returns [`PlatformErrorCode::InvalidPayload`] on serialization failure or the adapter error.
pub async fn save_json_with<S: StorageAdapter + ?Sized, T: Serialize>(
    store: &S,
    key: &str,
    value: &T,
) -> AdapterResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| {
        PlatformError::new(store.platform(), PlatformErrorCode::InvalidPayload, e.to_string())
    })?;
    store.set(key, &raw).await
}

/// In-memory storage adapter. Always available.
#[derive(Debug, Clone)]
pub struct MemoryStorageAdapter {
    platform: Platform,
    inner: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorageAdapter {
    /// Creates an empty store tagged with `platform`.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            inner: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryStorageAdapter {
    fn default() -> Self {
        Self::new(Platform::Web)
    }
}

impl PlatformAdapter for MemoryStorageAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn initialize(&self) -> AdapterFuture<'_, AdapterState> {
        Box::pin(async { AdapterState::Available })
    }

    fn state(&self) -> AdapterState {
        AdapterState::Available
    }

    fn capabilities(&self) -> CapabilitySubset {
        storage_capabilities(true)
    }
}

impl StorageAdapter for MemoryStorageAdapter {
    fn get<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<Option<String>>> {
        Box::pin(async move { Ok(self.inner.borrow().get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.inner
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.inner.borrow_mut().remove(key);
            Ok(())
        })
    }

    fn clear(&self) -> AdapterFuture<'_, AdapterResult<()>> {
        Box::pin(async move {
            self.inner.borrow_mut().clear();
            Ok(())
        })
    }

    fn keys(&self) -> AdapterFuture<'_, AdapterResult<Vec<String>>> {
        Box::pin(async move { Ok(self.inner.borrow().keys().cloned().collect()) })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct SavedRoute {
        origin: String,
        destination: String,
        min_charge_pct: u8,
    }

    #[test]
    fn memory_store_round_trip_keys_and_clear() {
        let store = MemoryStorageAdapter::default();
        let store_obj: &dyn StorageAdapter = &store;

        block_on(store_obj.set("b", "2")).expect("set b");
        block_on(store_obj.set("a", "1")).expect("set a");
        assert_eq!(block_on(store_obj.get("a")).expect("get"), Some("1".to_string()));
        assert_eq!(
            block_on(store_obj.keys()).expect("keys"),
            vec!["a".to_string(), "b".to_string()]
        );

        block_on(store_obj.remove("a")).expect("remove");
        block_on(store_obj.remove("missing")).expect("remove missing");
        assert_eq!(block_on(store_obj.get("a")).expect("get"), None);

        block_on(store_obj.clear()).expect("clear");
        assert!(block_on(store_obj.keys()).expect("keys").is_empty());
    }

    #[test]
    fn typed_json_helpers_round_trip() {
        let store = MemoryStorageAdapter::default();
        let route = SavedRoute {
            origin: "Berlin".to_string(),
            destination: "Munich".to_string(),
            min_charge_pct: 20,
        };
        block_on(save_json_with(&store, "route.last", &route)).expect("save");

        let loaded: Option<SavedRoute> =
            block_on(load_json_with(&store, "route.last")).expect("load");
        assert_eq!(loaded, Some(route));
    }

    #[test]
    fn malformed_json_is_an_invalid_payload_error() {
        let store = MemoryStorageAdapter::new(Platform::Ios);
        block_on(store.set("route.last", "{not json")).expect("set");

        let err = block_on(load_json_with::<_, SavedRoute>(&store, "route.last"))
            .expect_err("invalid json");
        assert_eq!(err.code, PlatformErrorCode::InvalidPayload);
        assert_eq!(err.platform, Platform::Ios);
    }
}
