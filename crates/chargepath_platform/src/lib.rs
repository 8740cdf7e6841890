//! Platform detection, capability contracts, and dispatch helpers for the ChargePath client.
//!
//! This crate is the API-first boundary for device capabilities. It owns the platform model,
//! the host-environment probe contract, the [`PlatformDetector`], the six capability traits
//! (storage, HTTP, notifications, geolocation, camera, device), typed errors, the two-branch
//! conditional-import helper, and the caller-side retry helper. Concrete browser and
//! native-runtime adapters live in `chargepath_adapters`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod adapter;
pub mod capability;
pub mod conditional;
pub mod config;
pub mod detector;
pub mod environment;
pub mod error;
pub mod platform;
pub mod retry;
pub mod time;

pub use adapter::{AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState, PlatformAdapter};
pub use capability::camera::{
    camera_capabilities, CameraAdapter, CameraPermissions, Photo, PhotoOptions, PhotoResultType,
    PhotoSource,
};
pub use capability::device::{
    device_capabilities, parse_user_agent, BatteryInfo, ConnectionType, DeviceAdapter, DeviceInfo,
    NetworkStatus, OperatingSystem, UserAgentDetails,
};
pub use capability::geolocation::{
    geolocation_capabilities, GeolocationAdapter, Position, PositionCallback, PositionOptions,
    WatchId,
};
pub use capability::http::{
    ensure_success, merge_headers, parse_body, resolve_url, HttpAdapter, HttpMethod, HttpRequest,
    HttpRequestConfig, HttpResponse,
};
pub use capability::notifications::{
    notification_capabilities, LocalNotification, NotificationAdapter, PushRegistration,
};
pub use capability::storage::{
    load_json_with, save_json_with, storage_capabilities, MemoryStorageAdapter, StorageAdapter,
    STORAGE_PROBE_KEY,
};
pub use capability::PermissionState;
pub use conditional::{
    batch_conditional_import, conditional_import, conditional_import_with_fallback,
    create_platform_adapter, is_platform_module_available, ImportFuture, PlatformModule,
};
pub use config::{selected_platform_override, HttpDefaults, PlatformConfig};
pub use detector::PlatformDetector;
pub use environment::{BrowserApi, HostEnvironment, StaticEnvironment};
pub use error::{
    BridgeError, FallbackAction, ImportBranch, ImportFailure, PlatformError, PlatformErrorCode,
    PlatformImportError,
};
pub use platform::{CapabilitySubset, Platform, PlatformCapabilities};
pub use retry::{with_retry, Backoff, HostTimer, RetryOptions, Timer, TimerFuture};
pub use time::{millis_until, unix_time_ms_now};
