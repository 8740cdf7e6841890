//! Translation of bridge rejections and payloads into typed platform errors.

use chargepath_platform::{
    AdapterResult, BridgeError, Platform, PlatformError, PlatformErrorCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Error codes a capability reports for each class of bridge rejection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ErrorCodes {
    pub unsupported: PlatformErrorCode,
    pub denied: Option<PlatformErrorCode>,
    pub timeout: Option<PlatformErrorCode>,
    pub cancelled: Option<PlatformErrorCode>,
    pub failed: PlatformErrorCode,
    /// Whether `failed` errors may succeed on retry.
    pub failed_recoverable: bool,
}

pub(crate) const STORAGE_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::StorageUnavailable,
    denied: None,
    timeout: None,
    cancelled: None,
    failed: PlatformErrorCode::StorageOperationFailed,
    failed_recoverable: false,
};

pub(crate) const HTTP_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::HttpUnavailable,
    denied: None,
    timeout: Some(PlatformErrorCode::HttpTimeout),
    cancelled: None,
    failed: PlatformErrorCode::HttpRequestFailed,
    failed_recoverable: true,
};

pub(crate) const NOTIFICATION_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::NotificationsUnsupported,
    denied: Some(PlatformErrorCode::NotificationPermissionDenied),
    timeout: None,
    cancelled: None,
    failed: PlatformErrorCode::NotificationScheduleFailed,
    failed_recoverable: false,
};

pub(crate) const PUSH_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::PushUnsupported,
    denied: Some(PlatformErrorCode::NotificationPermissionDenied),
    timeout: None,
    cancelled: None,
    failed: PlatformErrorCode::PushRegistrationFailed,
    failed_recoverable: true,
};

pub(crate) const GEOLOCATION_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::GeolocationUnsupported,
    denied: Some(PlatformErrorCode::GeolocationPermissionDenied),
    timeout: Some(PlatformErrorCode::GeolocationTimeout),
    cancelled: None,
    failed: PlatformErrorCode::GeolocationPositionUnavailable,
    failed_recoverable: true,
};

pub(crate) const CAMERA_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::CameraUnsupported,
    denied: Some(PlatformErrorCode::CameraPermissionDenied),
    timeout: None,
    cancelled: Some(PlatformErrorCode::CameraCancelled),
    failed: PlatformErrorCode::CameraCaptureFailed,
    failed_recoverable: false,
};

pub(crate) const DEVICE_CODES: ErrorCodes = ErrorCodes {
    unsupported: PlatformErrorCode::DeviceUnavailable,
    denied: None,
    timeout: None,
    cancelled: None,
    failed: PlatformErrorCode::DeviceQueryFailed,
    failed_recoverable: false,
};

/// Classifies a bridge rejection. Missing APIs win over every other reading.
pub(crate) fn map_bridge_error(
    platform: Platform,
    codes: &ErrorCodes,
    err: BridgeError,
) -> PlatformError {
    if err.is_unimplemented() {
        return PlatformError::new(platform, codes.unsupported, err.message);
    }
    if let Some(code) = codes.cancelled.filter(|_| err.is_cancelled()) {
        return PlatformError::new(platform, code, err.message);
    }
    if let Some(code) = codes.denied.filter(|_| err.is_permission_denied()) {
        return PlatformError::permission_denied(platform, code, err.message);
    }
    if let Some(code) = codes.timeout.filter(|_| err.is_timeout()) {
        return PlatformError::new(platform, code, err.message).recoverable();
    }
    let mapped = PlatformError::new(platform, codes.failed, err.message);
    if codes.failed_recoverable {
        mapped.recoverable()
    } else {
        mapped
    }
}

/// Decodes a bridge payload, reporting shape mismatches as [`PlatformErrorCode::InvalidPayload`].
pub(crate) fn decode<T: DeserializeOwned>(platform: Platform, value: Value) -> AdapterResult<T> {
    serde_json::from_value(value).map_err(|e| {
        PlatformError::new(
            platform,
            PlatformErrorCode::InvalidPayload,
            format!("unexpected bridge payload: {e}"),
        )
    })
}

/// Serializes adapter options into a bridge payload.
pub(crate) fn encode<T: serde::Serialize>(platform: Platform, value: &T) -> AdapterResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        PlatformError::new(platform, PlatformErrorCode::InvalidPayload, e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use chargepath_platform::FallbackAction;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unimplemented_rejections_map_to_unsupported() {
        let err = map_bridge_error(
            Platform::Ios,
            &CAMERA_CODES,
            BridgeError::with_code("UNIMPLEMENTED", "Camera.getPhoto is not implemented"),
        );
        assert_eq!(err.code, PlatformErrorCode::CameraUnsupported);
        assert!(!err.recoverable);
    }

    #[test]
    fn cancellation_is_not_a_permission_denial() {
        let err = map_bridge_error(
            Platform::Android,
            &CAMERA_CODES,
            BridgeError::new("User cancelled photos app"),
        );
        assert_eq!(err.code, PlatformErrorCode::CameraCancelled);
        assert_eq!(err.fallback, None);
    }

    #[test]
    fn denials_suggest_opening_settings() {
        let err = map_bridge_error(
            Platform::Web,
            &GEOLOCATION_CODES,
            BridgeError::with_code("PERMISSION_DENIED", "User denied Geolocation"),
        );
        assert_eq!(err.code, PlatformErrorCode::GeolocationPermissionDenied);
        assert_eq!(err.fallback, Some(FallbackAction::OpenSettings));
    }

    #[test]
    fn timeouts_and_transient_failures_are_recoverable() {
        let timeout = map_bridge_error(
            Platform::Web,
            &GEOLOCATION_CODES,
            BridgeError::with_code("TIMEOUT", "Timeout expired"),
        );
        let unavailable = map_bridge_error(
            Platform::Web,
            &GEOLOCATION_CODES,
            BridgeError::with_code("POSITION_UNAVAILABLE", "no fix"),
        );

        assert_eq!(timeout.code, PlatformErrorCode::GeolocationTimeout);
        assert!(timeout.recoverable);
        assert_eq!(unavailable.code, PlatformErrorCode::GeolocationPositionUnavailable);
        assert!(unavailable.recoverable);
    }

    #[test]
    fn payload_mismatches_are_invalid_payload() {
        let err = decode::<Vec<String>>(Platform::Ios, Value::from(3)).expect_err("mismatch");
        assert_eq!(err.code, PlatformErrorCode::InvalidPayload);
    }
}
