//! Camera contract.

use serde::{Deserialize, Serialize};

use crate::{
    adapter::{AdapterFuture, AdapterResult, PlatformAdapter},
    capability::PermissionState,
    platform::CapabilitySubset,
};

/// Encoding of the returned photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhotoResultType {
    /// A platform file URI plus a web-usable path.
    #[default]
    Uri,
    /// Raw base64 data.
    Base64,
    /// A `data:` URL.
    DataUrl,
}

/// Where the photo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhotoSource {
    /// Let the user choose between camera and library.
    #[default]
    Prompt,
    /// Capture a new photo with the camera.
    Camera,
    /// Pick an existing photo from the library.
    Photos,
}

/// Capture options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoOptions {
    /// JPEG quality, 0-100.
    pub quality: u8,
    /// Let the user crop or adjust the photo before returning it.
    pub allow_editing: bool,
    /// How the captured image is returned.
    pub result_type: PhotoResultType,
    /// Where the photo comes from.
    pub source: PhotoSource,
    /// Target width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Target height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            quality: 90,
            allow_editing: false,
            result_type: PhotoResultType::Uri,
            source: PhotoSource::Prompt,
            width: None,
            height: None,
        }
    }
}

/// A captured photo.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Image format such as `jpeg` or `png`.
    pub format: String,
    #[serde(default)]
    pub base64_string: Option<String>,
    /// `data:` URL, when requested.
    #[serde(default)]
    pub data_url: Option<String>,
    /// Platform file path.
    #[serde(default)]
    pub path: Option<String>,
    /// Path usable from the web view.
    #[serde(default)]
    pub web_path: Option<String>,
}

/// Camera and photo-library permission posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraPermissions {
    /// Camera access.
    pub camera: PermissionState,
    /// Photo-library access.
    pub photos: PermissionState,
}

/// Camera capability.
pub trait CameraAdapter: PlatformAdapter {
    /// Requests camera and photo-library permissions.
    fn request_permissions(&self) -> AdapterFuture<'_, AdapterResult<CameraPermissions>>;

    /// Captures or picks a photo.
    fn get_photo(&self, options: PhotoOptions) -> AdapterFuture<'_, AdapterResult<Photo>>;
}

/// Camera capability flags shared by camera adapters.
pub fn camera_capabilities(available: bool) -> CapabilitySubset {
    CapabilitySubset {
        has_camera: Some(available),
        ..CapabilitySubset::default()
    }
}
