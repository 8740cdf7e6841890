//! Geolocation contract.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    adapter::{AdapterFuture, AdapterResult, PlatformAdapter},
    platform::CapabilitySubset,
};

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Degrees north of the equator.
    pub latitude: f64,
    /// Degrees east of Greenwich.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    /// Meters above the WGS84 ellipsoid.
    pub altitude: Option<f64>,
    /// Vertical accuracy in meters.
    pub altitude_accuracy: Option<f64>,
    /// Degrees clockwise from true north.
    pub heading: Option<f64>,
    /// Meters per second.
    pub speed: Option<f64>,
    /// Fix time in unix milliseconds.
    pub timestamp: u64,
}

/// Options for position requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionOptions {
    /// Prefer GPS-grade fixes over network-based ones.
    pub enable_high_accuracy: bool,
    /// Maximum wait for a fix.
    pub timeout: u32,
    /// Maximum age of a cached fix that may be returned.
    pub maximum_age: u32,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: 10_000,
            maximum_age: 0,
        }
    }
}

/// Identifier of an active position watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(pub String);

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Callback invoked for every watch update or watch error.
pub type PositionCallback = Rc<dyn Fn(AdapterResult<Position>)>;

/// Geolocation capability.
pub trait GeolocationAdapter: PlatformAdapter {
    /// Resolves the current position.
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> AdapterFuture<'_, AdapterResult<Position>>;

    /// Starts watching the position. Updates arrive through `callback` until
    /// [`GeolocationAdapter::clear_watch`] is called.
    fn watch_position(
        &self,
        options: PositionOptions,
        callback: PositionCallback,
    ) -> AdapterFuture<'_, AdapterResult<WatchId>>;

    /// Stops a watch. Unknown ids are ignored.
    fn clear_watch<'a>(&'a self, id: &'a WatchId) -> AdapterFuture<'a, AdapterResult<()>>;
}

/// Geolocation capability flags shared by geolocation adapters.
pub fn geolocation_capabilities(available: bool) -> CapabilitySubset {
    CapabilitySubset {
        has_geolocation: Some(available),
        ..CapabilitySubset::default()
    }
}
