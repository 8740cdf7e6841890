//! Camera and photo library through the native `Camera` plugin.

use std::rc::Rc;

use chargepath_platform::{
    camera_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    CameraAdapter, CameraPermissions, CapabilitySubset, PermissionState, Photo, PhotoOptions,
    Platform, PlatformAdapter, PlatformErrorCode,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{plugins::CAMERA, probe_plugin};
use crate::{
    mapping::{decode, encode, map_bridge_error, CAMERA_CODES},
    native_bridge::NativeBridge,
};

#[derive(Debug, Deserialize)]
struct PermissionTokens {
    camera: String,
    #[serde(default)]
    photos: Option<String>,
}

/// Native camera adapter.
pub struct NativeCameraAdapter {
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    lifecycle: AdapterLifecycle,
}

impl NativeCameraAdapter {
    /// Creates an uninitialized adapter for `platform`.
    pub fn new(platform: Platform, bridge: Rc<dyn NativeBridge>) -> Self {
        Self {
            platform,
            bridge,
            lifecycle: AdapterLifecycle::new("camera", platform),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        probe_plugin(self.bridge.as_ref(), CAMERA)
    }

    async fn call(&self, method: &str, options: Value) -> AdapterResult<Value> {
        self.lifecycle
            .require(PlatformErrorCode::CameraUnsupported, || self.probe())
            .await?;
        self.bridge
            .invoke(CAMERA, method, options)
            .await
            .map_err(|e| map_bridge_error(self.platform, &CAMERA_CODES, e))
    }
}

impl std::fmt::Debug for NativeCameraAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCameraAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for NativeCameraAdapter {
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
        camera_capabilities(self.is_available())
    }
}

impl CameraAdapter for NativeCameraAdapter {
    fn request_permissions(&self) -> AdapterFuture<'_, AdapterResult<CameraPermissions>> {
        Box::pin(async move {
            let raw = self
                .call(
                    "requestPermissions",
                    json!({"permissions": ["camera", "photos"]}),
                )
                .await?;
            let tokens: PermissionTokens = decode(self.platform, raw)?;
            let camera = PermissionState::from_token(&tokens.camera);
            Ok(CameraPermissions {
                camera,
                photos: tokens
                    .photos
                    .as_deref()
                    .map_or(camera, PermissionState::from_token),
            })
        })
    }

    fn get_photo(&self, options: PhotoOptions) -> AdapterFuture<'_, AdapterResult<Photo>> {
        Box::pin(async move {
            let raw = self
                .call("getPhoto", encode(self.platform, &options)?)
                .await?;
            decode(self.platform, raw)
        })
    }
}

#[cfg(test)]
mod tests {
    use chargepath_platform::{BridgeError, PhotoSource};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::native_bridge::RecordingNativeBridge;

    #[test]
    fn permissions_fall_back_to_camera_state_when_photos_missing() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[CAMERA]));
        bridge.respond(
            CAMERA,
            "requestPermissions",
            Ok(json!({"camera": "granted", "photos": "limited"})),
        );
        bridge.respond(CAMERA, "requestPermissions", Ok(json!({"camera": "denied"})));
        let adapter = NativeCameraAdapter::new(Platform::Ios, bridge);

        let first = block_on(adapter.request_permissions()).expect("first");
        let second = block_on(adapter.request_permissions()).expect("second");

        assert_eq!(first.camera, PermissionState::Granted);
        assert_eq!(first.photos, PermissionState::from_token("limited"));
        assert_eq!(
            second,
            CameraPermissions {
                camera: PermissionState::Denied,
                photos: PermissionState::Denied,
            }
        );
    }

    #[test]
    fn get_photo_forwards_options_and_decodes_the_photo() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[CAMERA]));
        bridge.respond(
            CAMERA,
            "getPhoto",
            Ok(json!({
                "format": "jpeg",
                "path": "file:///var/mobile/receipt.jpg",
                "webPath": "capacitor://localhost/_capacitor_file_/receipt.jpg",
            })),
        );
        let adapter = NativeCameraAdapter::new(Platform::Ios, bridge.clone());
        let options = PhotoOptions {
            quality: 70,
            source: PhotoSource::Camera,
            width: Some(1280),
            ..PhotoOptions::default()
        };

        let photo = block_on(adapter.get_photo(options)).expect("photo");

        assert_eq!(photo.format, "jpeg");
        assert_eq!(
            photo.web_path.as_deref(),
            Some("capacitor://localhost/_capacitor_file_/receipt.jpg")
        );
        assert_eq!(
            bridge.calls_to(CAMERA, "getPhoto")[0].options,
            json!({
                "quality": 70,
                "allowEditing": false,
                "resultType": "uri",
                "source": "CAMERA",
                "width": 1280,
            })
        );
    }

    #[test]
    fn user_cancellation_is_reported_as_cancelled() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[CAMERA]));
        bridge.respond(
            CAMERA,
            "getPhoto",
            Err(BridgeError::new("User cancelled photos app")),
        );
        let adapter = NativeCameraAdapter::new(Platform::Android, bridge);

        let err = block_on(adapter.get_photo(PhotoOptions::default())).expect_err("cancelled");

        assert_eq!(err.code, PlatformErrorCode::CameraCancelled);
        assert!(!err.recoverable);
    }
}
