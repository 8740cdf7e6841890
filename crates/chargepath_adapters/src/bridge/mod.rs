//! Browser capability bridge for the web adapters.
//!
//! The adapters only talk to this module; `interop` holds the `wasm32` DOM bindings and the
//! non-`wasm32` shim behind one API.

mod interop;

use chargepath_platform::{
    BatteryInfo, BridgeError, NetworkStatus, Photo, PhotoOptions, Position, PositionOptions,
};

pub(crate) use interop::PositionListener;
#[cfg(not(target_arch = "wasm32"))]
pub use interop::WEB_STORAGE_QUOTA_BYTES;

/// Returns whether a storage rejection is the browser's quota error.
pub(crate) fn is_quota_error(err: &BridgeError) -> bool {
    let code = err.code.as_deref().unwrap_or_default();
    code == "QuotaExceededError"
        || code == "NS_ERROR_DOM_QUOTA_REACHED"
        || err.message.to_ascii_lowercase().contains("quota")
}

pub(crate) async fn storage_probe(key: &str) -> Result<(), BridgeError> {
    interop::storage_probe(key).await
}

pub(crate) async fn storage_get(key: &str) -> Result<Option<String>, BridgeError> {
    interop::storage_get(key).await
}

pub(crate) async fn storage_set(key: &str, value: &str) -> Result<(), BridgeError> {
    interop::storage_set(key, value).await
}

pub(crate) async fn storage_remove(key: &str) -> Result<(), BridgeError> {
    interop::storage_remove(key).await
}

pub(crate) async fn storage_clear() -> Result<(), BridgeError> {
    interop::storage_clear().await
}

pub(crate) async fn storage_keys() -> Result<Vec<String>, BridgeError> {
    interop::storage_keys().await
}

pub(crate) async fn notification_permission() -> Result<String, BridgeError> {
    interop::notification_permission().await
}

pub(crate) async fn notification_request_permission() -> Result<String, BridgeError> {
    interop::notification_request_permission().await
}

pub(crate) async fn notification_show(id: i32, title: &str, body: &str) -> Result<(), BridgeError> {
    interop::notification_show(id, title, body).await
}

pub(crate) async fn notification_schedule(
    id: i32,
    delay_segments_ms: &[u32],
    title: &str,
    body: &str,
) -> Result<(), BridgeError> {
    interop::notification_schedule(id, delay_segments_ms, title, body).await
}

pub(crate) async fn notification_cancel(id: i32) -> Result<(), BridgeError> {
    interop::notification_cancel(id).await
}

pub(crate) async fn geolocation_current(options: &PositionOptions) -> Result<Position, BridgeError> {
    interop::geolocation_current(options).await
}

pub(crate) async fn geolocation_watch(
    options: &PositionOptions,
    listener: PositionListener,
) -> Result<String, BridgeError> {
    interop::geolocation_watch(options, listener).await
}

pub(crate) async fn geolocation_clear_watch(id: &str) -> Result<(), BridgeError> {
    interop::geolocation_clear_watch(id).await
}

pub(crate) async fn camera_request_permission() -> Result<String, BridgeError> {
    interop::camera_request_permission().await
}

pub(crate) async fn camera_capture(options: &PhotoOptions) -> Result<Photo, BridgeError> {
    interop::camera_capture(options).await
}

pub(crate) async fn device_battery() -> Result<BatteryInfo, BridgeError> {
    interop::device_battery().await
}

pub(crate) async fn device_network() -> Result<NetworkStatus, BridgeError> {
    interop::device_network().await
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn storage_shim_behaves_like_local_storage() {
        block_on(storage_clear()).expect("clear");
        block_on(storage_probe("__probe__")).expect("probe");
        assert_eq!(block_on(storage_keys()).expect("keys"), Vec::<String>::new());

        block_on(storage_set("route.last", "{\"id\":7}")).expect("set");
        block_on(storage_set("route.last", "{\"id\":8}")).expect("overwrite");
        assert_eq!(
            block_on(storage_get("route.last")).expect("get"),
            Some("{\"id\":8}".to_string())
        );

        block_on(storage_remove("route.last")).expect("remove");
        assert_eq!(block_on(storage_get("route.last")).expect("get"), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn storage_shim_enforces_quota() {
        block_on(storage_clear()).expect("clear");
        let oversized = "x".repeat(WEB_STORAGE_QUOTA_BYTES);
        let err = block_on(storage_set("tiles", &oversized)).expect_err("quota");

        assert!(is_quota_error(&err));
        assert_eq!(block_on(storage_get("tiles")).expect("get"), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn device_apis_are_unsupported_off_wasm() {
        let expected = Some("UNAVAILABLE".to_string());

        assert_eq!(
            block_on(notification_permission()).expect_err("permission").code,
            expected
        );
        assert_eq!(
            block_on(geolocation_current(&PositionOptions::default()))
                .expect_err("position")
                .code,
            expected
        );
        assert_eq!(
            block_on(camera_capture(&PhotoOptions::default()))
                .expect_err("capture")
                .code,
            expected
        );
        assert_eq!(block_on(device_network()).expect_err("network").code, expected);
    }

    #[test]
    fn quota_errors_are_recognized_by_code_or_message() {
        assert!(is_quota_error(&BridgeError::with_code(
            "QuotaExceededError",
            "full"
        )));
        assert!(is_quota_error(&BridgeError::new(
            "The quota has been exceeded."
        )));
        assert!(!is_quota_error(&BridgeError::new("SecurityError")));
    }
}
