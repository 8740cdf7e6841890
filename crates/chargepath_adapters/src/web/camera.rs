//! Camera adapter over `getUserMedia` and a capture file input.

use std::rc::Rc;

use chargepath_platform::{
    camera_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BrowserApi, CameraAdapter, CameraPermissions, CapabilitySubset, HostEnvironment,
    PermissionState, Photo, PhotoOptions, Platform, PlatformAdapter, PlatformErrorCode,
};

use crate::{
    bridge,
    mapping::{map_bridge_error, CAMERA_CODES},
};

/// Browser camera adapter.
///
/// Photos are picked through an `<input type="file" accept="image/*">`, so the library
/// permission is always granted; the camera permission comes from a short `getUserMedia` probe.
pub struct WebCameraAdapter {
    env: Rc<dyn HostEnvironment>,
    lifecycle: AdapterLifecycle,
}

impl WebCameraAdapter {
    /// Creates an uninitialized adapter probing `env`.
    pub fn new(env: Rc<dyn HostEnvironment>) -> Self {
        Self {
            env,
            lifecycle: AdapterLifecycle::new("camera", Platform::Web),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        if self.env.has_api(BrowserApi::MediaDevices) {
            Ok(())
        } else {
            Err("navigator.mediaDevices is not available".to_string())
        }
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::CameraUnsupported, || self.probe())
            .await
    }
}

impl std::fmt::Debug for WebCameraAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebCameraAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for WebCameraAdapter {
    fn platform(&self) -> Platform {
        Platform::Web
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

impl CameraAdapter for WebCameraAdapter {
    fn request_permissions(&self) -> AdapterFuture<'_, AdapterResult<CameraPermissions>> {
        Box::pin(async move {
            self.ready().await?;
            let token = bridge::camera_request_permission()
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &CAMERA_CODES, e))?;
            Ok(CameraPermissions {
                camera: PermissionState::from_token(&token),
                photos: PermissionState::Granted,
            })
        })
    }

    fn get_photo(&self, options: PhotoOptions) -> AdapterFuture<'_, AdapterResult<Photo>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::camera_capture(&options)
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &CAMERA_CODES, e))
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chargepath_platform::StaticEnvironment;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn no_media_devices_means_no_camera() {
        let adapter = WebCameraAdapter::new(Rc::new(
            StaticEnvironment::full_browser().without_api(BrowserApi::MediaDevices),
        ));

        let err = block_on(adapter.get_photo(PhotoOptions::default())).expect_err("unsupported");

        assert_eq!(err.code, PlatformErrorCode::CameraUnsupported);
        assert_eq!(adapter.capabilities().has_camera, Some(false));
    }

    #[test]
    fn missing_dom_bindings_read_as_unsupported() {
        let adapter = WebCameraAdapter::new(Rc::new(StaticEnvironment::full_browser()));

        let err = block_on(adapter.request_permissions()).expect_err("no dom");

        assert!(adapter.is_available());
        assert_eq!(err.code, PlatformErrorCode::CameraUnsupported);
    }
}
