use std::{cell::RefCell, collections::BTreeMap};

use super::*;

/// Per-origin `localStorage` budget emulated by the in-memory shim.
pub const WEB_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

thread_local! {
    static LOCAL_STORAGE: RefCell<BTreeMap<String, String>> = const { RefCell::new(BTreeMap::new()) };
}

fn unsupported() -> BridgeError {
    BridgeError::with_code(
        "UNAVAILABLE",
        "Browser device APIs are only available when compiled for wasm32",
    )
}

fn quota_exceeded(key: &str) -> BridgeError {
    BridgeError::with_code(
        "QuotaExceededError",
        format!("Setting the value of '{key}' exceeded the quota."),
    )
}

fn usage_without(entries: &BTreeMap<String, String>, skip: &str) -> usize {
    entries
        .iter()
        .filter(|(key, _)| key.as_str() != skip)
        .map(|(key, value)| key.len() + value.len())
        .sum()
}

pub async fn storage_probe(key: &str) -> Result<(), BridgeError> {
    storage_set(key, key).await?;
    storage_remove(key).await
}

pub async fn storage_get(key: &str) -> Result<Option<String>, BridgeError> {
    Ok(LOCAL_STORAGE.with(|entries| entries.borrow().get(key).cloned()))
}

pub async fn storage_set(key: &str, value: &str) -> Result<(), BridgeError> {
    LOCAL_STORAGE.with(|entries| {
        let mut entries = entries.borrow_mut();
        if usage_without(&entries, key) + key.len() + value.len() > WEB_STORAGE_QUOTA_BYTES {
            return Err(quota_exceeded(key));
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    })
}

pub async fn storage_remove(key: &str) -> Result<(), BridgeError> {
    LOCAL_STORAGE.with(|entries| {
        entries.borrow_mut().remove(key);
    });
    Ok(())
}

pub async fn storage_clear() -> Result<(), BridgeError> {
    LOCAL_STORAGE.with(|entries| entries.borrow_mut().clear());
    Ok(())
}

pub async fn storage_keys() -> Result<Vec<String>, BridgeError> {
    Ok(LOCAL_STORAGE.with(|entries| entries.borrow().keys().cloned().collect()))
}

pub async fn notification_permission() -> Result<String, BridgeError> {
    Err(unsupported())
}

pub async fn notification_request_permission() -> Result<String, BridgeError> {
    Err(unsupported())
}

pub async fn notification_show(_id: i32, _title: &str, _body: &str) -> Result<(), BridgeError> {
    Err(unsupported())
}

pub async fn notification_schedule(
    _id: i32,
    _delay_segments_ms: &[u32],
    _title: &str,
    _body: &str,
) -> Result<(), BridgeError> {
    Err(unsupported())
}

pub async fn notification_cancel(_id: i32) -> Result<(), BridgeError> {
    Err(unsupported())
}

pub async fn geolocation_current(_options: &PositionOptions) -> Result<Position, BridgeError> {
    Err(unsupported())
}

pub async fn geolocation_watch(
    _options: &PositionOptions,
    _listener: PositionListener,
) -> Result<String, BridgeError> {
    Err(unsupported())
}

pub async fn geolocation_clear_watch(_id: &str) -> Result<(), BridgeError> {
    Err(unsupported())
}

pub async fn camera_request_permission() -> Result<String, BridgeError> {
    Err(unsupported())
}

pub async fn camera_capture(_options: &PhotoOptions) -> Result<Photo, BridgeError> {
    Err(unsupported())
}

pub async fn device_battery() -> Result<BatteryInfo, BridgeError> {
    Err(unsupported())
}

pub async fn device_network() -> Result<NetworkStatus, BridgeError> {
    Err(unsupported())
}
