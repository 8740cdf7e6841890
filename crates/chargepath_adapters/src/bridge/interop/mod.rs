//! Shared transport interop for browser bridge domains.
//!
//! Calls are routed to the `wasm32` implementation (inline JavaScript over the DOM APIs) or to a
//! non-`wasm32` shim that emulates `localStorage` in memory and reports every other browser API
//! as unsupported.

use std::rc::Rc;

use chargepath_platform::{
    BatteryInfo, BridgeError, NetworkStatus, Photo, PhotoOptions, Position, PositionOptions,
};

#[cfg(not(target_arch = "wasm32"))]
mod non_wasm;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(not(target_arch = "wasm32"))]
use non_wasm as imp;
#[cfg(target_arch = "wasm32")]
use wasm as imp;

#[cfg(not(target_arch = "wasm32"))]
pub use non_wasm::WEB_STORAGE_QUOTA_BYTES;

/// Receives every update of a browser position watch.
pub type PositionListener = Rc<dyn Fn(Result<Position, BridgeError>)>;

pub async fn storage_probe(key: &str) -> Result<(), BridgeError> {
    imp::storage_probe(key).await
}

pub async fn storage_get(key: &str) -> Result<Option<String>, BridgeError> {
    imp::storage_get(key).await
}

pub async fn storage_set(key: &str, value: &str) -> Result<(), BridgeError> {
    imp::storage_set(key, value).await
}

pub async fn storage_remove(key: &str) -> Result<(), BridgeError> {
    imp::storage_remove(key).await
}

pub async fn storage_clear() -> Result<(), BridgeError> {
    imp::storage_clear().await
}

pub async fn storage_keys() -> Result<Vec<String>, BridgeError> {
    imp::storage_keys().await
}

pub async fn notification_permission() -> Result<String, BridgeError> {
    imp::notification_permission().await
}

pub async fn notification_request_permission() -> Result<String, BridgeError> {
    imp::notification_request_permission().await
}

pub async fn notification_show(id: i32, title: &str, body: &str) -> Result<(), BridgeError> {
    imp::notification_show(id, title, body).await
}

pub async fn notification_schedule(
    id: i32,
    delay_segments_ms: &[u32],
    title: &str,
    body: &str,
) -> Result<(), BridgeError> {
    imp::notification_schedule(id, delay_segments_ms, title, body).await
}

pub async fn notification_cancel(id: i32) -> Result<(), BridgeError> {
    imp::notification_cancel(id).await
}

pub async fn geolocation_current(options: &PositionOptions) -> Result<Position, BridgeError> {
    imp::geolocation_current(options).await
}

pub async fn geolocation_watch(
    options: &PositionOptions,
    listener: PositionListener,
) -> Result<String, BridgeError> {
    imp::geolocation_watch(options, listener).await
}

pub async fn geolocation_clear_watch(id: &str) -> Result<(), BridgeError> {
    imp::geolocation_clear_watch(id).await
}

pub async fn camera_request_permission() -> Result<String, BridgeError> {
    imp::camera_request_permission().await
}

pub async fn camera_capture(options: &PhotoOptions) -> Result<Photo, BridgeError> {
    imp::camera_capture(options).await
}

pub async fn device_battery() -> Result<BatteryInfo, BridgeError> {
    imp::device_battery().await
}

pub async fn device_network() -> Result<NetworkStatus, BridgeError> {
    imp::device_network().await
}
