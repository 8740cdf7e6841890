//! Platform-layer configuration.
//!
//! Configuration comes from two places: cargo features that pin the platform at build time, and
//! a JSON document (usually bundled with the app shell) parsed into [`PlatformConfig`].

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    capability::geolocation::PositionOptions, platform::Platform, retry::RetryOptions,
};

#[cfg(all(feature = "platform-ios", feature = "platform-android"))]
compile_error!("features `platform-ios` and `platform-android` are mutually exclusive; enable only one");

/// Returns the platform pinned by cargo features, if any.
pub const fn selected_platform_override() -> Option<Platform> {
    #[cfg(feature = "platform-ios")]
    {
        Some(Platform::Ios)
    }

    #[cfg(feature = "platform-android")]
    {
        Some(Platform::Android)
    }

    #[cfg(not(any(feature = "platform-ios", feature = "platform-android")))]
    {
        None
    }
}

/// Defaults applied by HTTP adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpDefaults {
    /// Base URL relative request paths are resolved against.
    pub base_url: Option<String>,
    /// Timeout applied when a request does not set one.
    pub timeout_ms: u64,
    /// Headers sent with every request.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 30_000,
            default_headers: BTreeMap::from([(
                "Accept".to_string(),
                "application/json".to_string(),
            )]),
        }
    }
}

impl HttpDefaults {
    /// Default timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Complete platform-layer configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformConfig {
    /// Pins the platform instead of probing. Cargo features take precedence.
    pub platform_override: Option<Platform>,
    /// Defaults applied to every HTTP request.
    pub http: HttpDefaults,
    /// Options used when callers do not pass their own.
    pub geolocation: PositionOptions,
    /// Default policy handed to callers of the retry helper.
    pub retry: RetryOptions,
}

impl PlatformConfig {
    /// Parses a JSON configuration document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parser message when the document is not valid JSON for this schema.
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("invalid platform config: {e}"))
    }

    /// Effective platform override: cargo features first, then the configured value.
    pub fn effective_platform_override(&self) -> Option<Platform> {
        selected_platform_override().or(self.platform_override)
    }
}
