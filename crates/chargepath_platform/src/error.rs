//! Typed errors raised by platform adapters and the conditional-import helper.

use std::time::Duration;

use thiserror::Error;

use crate::platform::Platform;

/// Stable error codes carried by [`PlatformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformErrorCode {
    /// Storage API missing or its probe failed.
    StorageUnavailable,
    /// Write rejected because the storage quota is full.
    StorageQuotaExceeded,
    /// Storage call failed for another reason.
    StorageOperationFailed,
    /// No HTTP transport available.
    HttpUnavailable,
    /// Request could not be sent or the connection failed.
    HttpRequestFailed,
    /// Server answered with a non-2xx status.
    HttpStatus,
    /// Request exceeded its timeout.
    HttpTimeout,
    /// Notification API missing.
    NotificationsUnsupported,
    /// User denied notification permission.
    NotificationPermissionDenied,
    /// Scheduling or showing a notification failed.
    NotificationScheduleFailed,
    /// Push registration is not possible here.
    PushUnsupported,
    /// Push registration was rejected.
    PushRegistrationFailed,
    /// Geolocation API missing.
    GeolocationUnsupported,
    /// User denied location permission.
    GeolocationPermissionDenied,
    /// No position fix could be obtained.
    GeolocationPositionUnavailable,
    /// Position fix timed out.
    GeolocationTimeout,
    /// Camera API missing.
    CameraUnsupported,
    /// User denied camera permission.
    CameraPermissionDenied,
    /// User dismissed the camera or picker.
    CameraCancelled,
    /// Capture failed for another reason.
    CameraCaptureFailed,
    /// Device information API missing.
    DeviceUnavailable,
    /// Device query failed.
    DeviceQueryFailed,
    /// Host returned data that could not be decoded.
    InvalidPayload,
}

impl PlatformErrorCode {
    /// Returns the wire token for this code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
            Self::StorageQuotaExceeded => "STORAGE_QUOTA_EXCEEDED",
            Self::StorageOperationFailed => "STORAGE_OPERATION_FAILED",
            Self::HttpUnavailable => "HTTP_UNAVAILABLE",
            Self::HttpRequestFailed => "HTTP_REQUEST_FAILED",
            Self::HttpStatus => "HTTP_STATUS",
            Self::HttpTimeout => "HTTP_TIMEOUT",
            Self::NotificationsUnsupported => "NOTIFICATIONS_UNSUPPORTED",
            Self::NotificationPermissionDenied => "NOTIFICATION_PERMISSION_DENIED",
            Self::NotificationScheduleFailed => "NOTIFICATION_SCHEDULE_FAILED",
            Self::PushUnsupported => "PUSH_UNSUPPORTED",
            Self::PushRegistrationFailed => "PUSH_REGISTRATION_FAILED",
            Self::GeolocationUnsupported => "GEOLOCATION_UNSUPPORTED",
            Self::GeolocationPermissionDenied => "GEOLOCATION_PERMISSION_DENIED",
            Self::GeolocationPositionUnavailable => "GEOLOCATION_POSITION_UNAVAILABLE",
            Self::GeolocationTimeout => "GEOLOCATION_TIMEOUT",
            Self::CameraUnsupported => "CAMERA_UNSUPPORTED",
            Self::CameraPermissionDenied => "CAMERA_PERMISSION_DENIED",
            Self::CameraCancelled => "CAMERA_CANCELLED",
            Self::CameraCaptureFailed => "CAMERA_CAPTURE_FAILED",
            Self::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            Self::DeviceQueryFailed => "DEVICE_QUERY_FAILED",
            Self::InvalidPayload => "INVALID_PAYLOAD",
        }
    }
}

impl std::fmt::Display for PlatformErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested recovery attached to a [`PlatformError`].
///
/// The adapter never performs the action itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackAction {
    /// Free space by evicting the oldest or least useful stored entries, then retry.
    EvictStaleEntries,
    /// Serve a previously cached value instead.
    UseCachedValue,
    /// Retry after the given delay.
    RetryAfter(Duration),
    /// Ask the user to change a permission in system settings.
    OpenSettings,
}

/// Error raised by a capability adapter operation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{platform}] {code}: {message}")]
pub struct PlatformError {
    /// Platform whose adapter raised the error.
    pub platform: Platform,
    /// Stable error code.
    pub code: PlatformErrorCode,
    /// Human-readable detail.
    pub message: String,
    /// Whether retrying the same call may succeed.
    pub recoverable: bool,
    /// Optional recovery suggestion.
    pub fallback: Option<FallbackAction>,
}

impl PlatformError {
    /// Creates a non-recoverable error without a fallback.
    pub fn new(platform: Platform, code: PlatformErrorCode, message: impl Into<String>) -> Self {
        Self {
            platform,
            code,
            message: message.into(),
            recoverable: false,
            fallback: None,
        }
    }

    /// Marks the error as recoverable.
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    /// Attaches a recovery suggestion.
    pub fn with_fallback(mut self, fallback: FallbackAction) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Storage quota exhaustion, recoverable by evicting entries.
    pub fn quota_exceeded(platform: Platform, message: impl Into<String>) -> Self {
        Self::new(platform, PlatformErrorCode::StorageQuotaExceeded, message)
            .recoverable()
            .with_fallback(FallbackAction::EvictStaleEntries)
    }

    /// Permission denial that only the user can reverse.
    pub fn permission_denied(
        platform: Platform,
        code: PlatformErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self::new(platform, code, message).with_fallback(FallbackAction::OpenSettings)
    }
}

/// Branch a conditional import attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportBranch {
    /// Browser implementation branch.
    Web,
    /// Native-runtime implementation branch.
    Native,
}

impl ImportBranch {
    /// Returns a stable string token.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Native => "native",
        }
    }
}

impl std::fmt::Display for ImportBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boxed error produced by a platform module factory.
pub type ImportFailure = Box<dyn std::error::Error + 'static>;

/// A platform module factory failed for the selected branch.
#[derive(Debug, Error)]
#[error("failed to load {platform} platform module: {original_error}")]
pub struct PlatformImportError {
    /// Branch that was attempted.
    pub platform: ImportBranch,
    /// Error raised by the branch factory.
    #[source]
    pub original_error: ImportFailure,
}

/// Rejection reported by a native-runtime bridge call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BridgeError {
    /// Plugin-specific error code, when the bridge provides one.
    pub code: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl BridgeError {
    /// Creates a bridge error without a code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Creates a bridge error with a plugin error code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Returns whether the rejection reads as a permission denial.
    pub fn is_permission_denied(&self) -> bool {
        self.mentions(&["denied", "permission", "not authorized"])
    }

    /// Returns whether the rejection reads as a user cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.mentions(&["cancel"])
    }

    /// Returns whether the rejection reads as a timeout.
    pub fn is_timeout(&self) -> bool {
        self.mentions(&["timeout", "timed out"])
    }

    /// Returns whether the bridge reports the plugin or method as missing.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self.code.as_deref(), Some("UNIMPLEMENTED" | "UNAVAILABLE"))
            || self.mentions(&["not implemented"])
    }

    fn mentions(&self, needles: &[&str]) -> bool {
        let message = self.message.to_ascii_lowercase();
        let code = self.code.as_deref().unwrap_or_default().to_ascii_lowercase();
        needles
            .iter()
            .any(|needle| message.contains(needle) || code.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_platform_and_code() {
        let err = PlatformError::new(
            Platform::Web,
            PlatformErrorCode::NotificationsUnsupported,
            "Notification API missing",
        );
        assert_eq!(
            err.to_string(),
            "[web] NOTIFICATIONS_UNSUPPORTED: Notification API missing"
        );
        assert!(!err.recoverable);
    }

    #[test]
    fn quota_errors_suggest_eviction() {
        let err = PlatformError::quota_exceeded(Platform::Android, "full");
        assert!(err.recoverable);
        assert_eq!(err.fallback, Some(FallbackAction::EvictStaleEntries));
    }

    #[test]
    fn bridge_error_classification() {
        assert!(BridgeError::new("User denied access to photos").is_permission_denied());
        assert!(BridgeError::new("User cancelled photos app").is_cancelled());
        assert!(BridgeError::with_code("UNIMPLEMENTED", "Camera not implemented").is_unimplemented());
        assert!(BridgeError::with_code("OS-PLUG-GLOC-0010", "Location timed out").is_timeout());
    }
}
