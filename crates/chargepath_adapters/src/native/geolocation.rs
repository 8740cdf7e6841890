//! Geolocation through the native `Geolocation` plugin.

use std::rc::Rc;

use chargepath_platform::{
    geolocation_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BridgeError, CapabilitySubset, GeolocationAdapter, Platform, PlatformAdapter,
    PlatformErrorCode, Position, PositionCallback, PositionOptions, WatchId,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{plugins::GEOLOCATION, probe_plugin};
use crate::{
    mapping::{decode, encode, map_bridge_error, GEOLOCATION_CODES},
    native_bridge::{BridgeListener, NativeBridge},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Coordinates {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    altitude_accuracy: Option<f64>,
    #[serde(default)]
    heading: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NativePosition {
    timestamp: f64,
    coords: Coordinates,
}

impl From<NativePosition> for Position {
    fn from(native: NativePosition) -> Self {
        let coords = native.coords;
        Self {
            latitude: coords.latitude,
            longitude: coords.longitude,
            accuracy: coords.accuracy,
            altitude: coords.altitude,
            altitude_accuracy: coords.altitude_accuracy,
            heading: coords.heading,
            speed: coords.speed,
            timestamp: native.timestamp.max(0.0) as u64,
        }
    }
}

fn position_from(platform: Platform, raw: Value) -> AdapterResult<Position> {
    decode::<NativePosition>(platform, raw).map(Position::from)
}

/// Native geolocation adapter.
pub struct NativeGeolocationAdapter {
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    lifecycle: AdapterLifecycle,
}

impl NativeGeolocationAdapter {
    /// Creates an uninitialized adapter for `platform`.
    pub fn new(platform: Platform, bridge: Rc<dyn NativeBridge>) -> Self {
        Self {
            platform,
            bridge,
            lifecycle: AdapterLifecycle::new("geolocation", platform),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        probe_plugin(self.bridge.as_ref(), GEOLOCATION)
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::GeolocationUnsupported, || self.probe())
            .await
    }
}

impl std::fmt::Debug for NativeGeolocationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeGeolocationAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for NativeGeolocationAdapter {
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
        geolocation_capabilities(self.is_available())
    }
}

impl GeolocationAdapter for NativeGeolocationAdapter {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> AdapterFuture<'_, AdapterResult<Position>> {
        Box::pin(async move {
            self.ready().await?;
            let raw = self
                .bridge
                .invoke(
                    GEOLOCATION,
                    "getCurrentPosition",
                    encode(self.platform, &options)?,
                )
                .await
                .map_err(|e| map_bridge_error(self.platform, &GEOLOCATION_CODES, e))?;
            position_from(self.platform, raw)
        })
    }

    fn watch_position(
        &self,
        options: PositionOptions,
        callback: PositionCallback,
    ) -> AdapterFuture<'_, AdapterResult<WatchId>> {
        Box::pin(async move {
            self.ready().await?;
            let platform = self.platform;
            let listener: BridgeListener = Rc::new(move |event: Result<Value, BridgeError>| {
                callback(match event {
                    Ok(raw) => position_from(platform, raw),
                    Err(err) => Err(map_bridge_error(platform, &GEOLOCATION_CODES, err)),
                });
            });
            let id = self
                .bridge
                .listen(
                    GEOLOCATION,
                    "watchPosition",
                    encode(self.platform, &options)?,
                    listener,
                )
                .await
                .map_err(|e| map_bridge_error(self.platform, &GEOLOCATION_CODES, e))?;
            debug!(watch_id = id.as_str(), "position watch started");
            Ok(WatchId(id))
        })
    }

    fn clear_watch<'a>(&'a self, id: &'a WatchId) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            let cleared = self
                .bridge
                .invoke(GEOLOCATION, "clearWatch", json!({ "id": id.0 }))
                .await;
            self.bridge.release(&id.0);
            cleared
                .map(|_| ())
                .map_err(|e| map_bridge_error(self.platform, &GEOLOCATION_CODES, e))
        })
    }
}
