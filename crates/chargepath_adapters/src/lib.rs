//! Browser and native-runtime implementations of the [`chargepath_platform`] capability
//! contracts.
//!
//! This crate is the concrete wiring layer: a browser environment probe, the six web adapters,
//! the six native adapters, the [`AdapterRegistry`] that groups them per platform, and the
//! [`PlatformContext`] that detects the platform once and hands out adapters.
//!
//! Host bindings are split by transport:
//! - `bridge` (browser APIs; `wasm32` DOM bindings and a non-`wasm32` shim)
//! - [`native_bridge`] (native-runtime plugin calls behind the [`NativeBridge`] trait)

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

mod bridge;
pub mod context;
pub mod environment;
mod mapping;
pub mod native;
pub mod native_bridge;
pub mod registry;
pub mod web;

pub use context::PlatformContext;
pub use environment::BrowserEnvironment;
pub use native::{
    NativeCameraAdapter, NativeDeviceAdapter, NativeGeolocationAdapter, NativeHttpAdapter,
    NativeNotificationAdapter, NativeStorageAdapter,
};
pub use native_bridge::{
    BridgeCall, BridgeFuture, BridgeListener, CapacitorBridge, NativeBridge,
    RecordingNativeBridge,
};
pub use registry::{AdapterRegistry, RegistryStates};
pub use web::{
    WebCameraAdapter, WebDeviceAdapter, WebGeolocationAdapter, WebHttpAdapter,
    WebNotificationAdapter, WebStorageAdapter, DEVICE_ID_KEY,
};
