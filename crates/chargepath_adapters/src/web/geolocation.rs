//! `navigator.geolocation` adapter.

use std::rc::Rc;

use chargepath_platform::{
    geolocation_capabilities, AdapterFuture, AdapterLifecycle, AdapterResult, AdapterState,
    BridgeError, BrowserApi, CapabilitySubset, GeolocationAdapter, HostEnvironment, Platform,
    PlatformAdapter, PlatformErrorCode, Position, PositionCallback, PositionOptions, WatchId,
};

use crate::{
    bridge,
    mapping::{map_bridge_error, GEOLOCATION_CODES},
};

/// Browser geolocation adapter.
pub struct WebGeolocationAdapter {
    env: Rc<dyn HostEnvironment>,
    lifecycle: AdapterLifecycle,
}

impl WebGeolocationAdapter {
    /// Creates an uninitialized adapter probing `env`.
    pub fn new(env: Rc<dyn HostEnvironment>) -> Self {
        Self {
            env,
            lifecycle: AdapterLifecycle::new("geolocation", Platform::Web),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        if self.env.has_api(BrowserApi::Geolocation) {
            Ok(())
        } else {
            Err("navigator.geolocation is not available".to_string())
        }
    }

    async fn ready(&self) -> AdapterResult<()> {
        self.lifecycle
            .require(PlatformErrorCode::GeolocationUnsupported, || self.probe())
            .await
    }
}

impl std::fmt::Debug for WebGeolocationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGeolocationAdapter")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for WebGeolocationAdapter {
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
        geolocation_capabilities(self.is_available())
    }
}

impl GeolocationAdapter for WebGeolocationAdapter {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> AdapterFuture<'_, AdapterResult<Position>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::geolocation_current(&options)
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &GEOLOCATION_CODES, e))
        })
    }

    fn watch_position(
        &self,
        options: PositionOptions,
        callback: PositionCallback,
    ) -> AdapterFuture<'_, AdapterResult<WatchId>> {
        Box::pin(async move {
            self.ready().await?;
            let listener: bridge::PositionListener =
                Rc::new(move |update: Result<Position, BridgeError>| {
                    callback(
                        update.map_err(|e| map_bridge_error(Platform::Web, &GEOLOCATION_CODES, e)),
                    );
                });
            bridge::geolocation_watch(&options, listener)
                .await
                .map(WatchId)
                .map_err(|e| map_bridge_error(Platform::Web, &GEOLOCATION_CODES, e))
        })
    }

    fn clear_watch<'a>(&'a self, id: &'a WatchId) -> AdapterFuture<'a, AdapterResult<()>> {
        Box::pin(async move {
            self.ready().await?;
            bridge::geolocation_clear_watch(&id.0)
                .await
                .map_err(|e| map_bridge_error(Platform::Web, &GEOLOCATION_CODES, e))
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
    fn headless_host_has_no_geolocation() {
        let adapter = WebGeolocationAdapter::new(Rc::new(StaticEnvironment::headless()));

        let err = block_on(adapter.current_position(PositionOptions::default()))
            .expect_err("unsupported");

        assert_eq!(err.code, PlatformErrorCode::GeolocationUnsupported);
        assert_eq!(adapter.capabilities().has_geolocation, Some(false));
    }
}
