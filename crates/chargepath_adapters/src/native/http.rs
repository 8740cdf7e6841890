//! HTTP through the native `CapacitorHttp` plugin, which bypasses web-view CORS.

use std::{collections::BTreeMap, rc::Rc};

use chargepath_platform::{
    ensure_success, merge_headers, parse_body, resolve_url, AdapterFuture, AdapterLifecycle,
    AdapterResult, AdapterState, CapabilitySubset, HttpAdapter, HttpDefaults, HttpRequest,
    HttpResponse, Platform, PlatformAdapter, PlatformErrorCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{plugins::HTTP, probe_plugin};
use crate::{
    mapping::{decode, encode, map_bridge_error, HTTP_CODES},
    native_bridge::NativeBridge,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NativeRequest<'a> {
    url: String,
    method: &'static str,
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    connect_timeout: u64,
    read_timeout: u64,
    response_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct NativeResponse {
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    url: Option<String>,
}

/// Native HTTP adapter.
pub struct NativeHttpAdapter {
    platform: Platform,
    bridge: Rc<dyn NativeBridge>,
    defaults: HttpDefaults,
    lifecycle: AdapterLifecycle,
}

impl NativeHttpAdapter {
    /// Creates an uninitialized adapter using `defaults` for base URL, timeout, and headers.
    pub fn new(platform: Platform, bridge: Rc<dyn NativeBridge>, defaults: HttpDefaults) -> Self {
        Self {
            platform,
            bridge,
            defaults,
            lifecycle: AdapterLifecycle::new("http", platform),
        }
    }

    async fn probe(&self) -> Result<(), String> {
        probe_plugin(self.bridge.as_ref(), HTTP)
    }

    fn native_request<'a>(&self, request: &'a HttpRequest) -> NativeRequest<'a> {
        let timeout_ms = request
            .config
            .timeout
            .map_or(self.defaults.timeout_ms, |t| {
                u64::try_from(t.as_millis()).unwrap_or(u64::MAX)
            });
        NativeRequest {
            url: resolve_url(self.defaults.base_url.as_deref(), &request.url),
            method: request.method.as_str(),
            headers: merge_headers(&self.defaults.default_headers, &request.config.headers),
            params: request.config.params.clone(),
            data: request.body.as_ref(),
            connect_timeout: timeout_ms,
            read_timeout: timeout_ms,
            response_type: "json",
        }
    }
}

impl std::fmt::Debug for NativeHttpAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHttpAdapter")
            .field("defaults", &self.defaults)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter for NativeHttpAdapter {
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
        CapabilitySubset {
            has_network: Some(self.is_available()),
            ..CapabilitySubset::default()
        }
    }
}

impl HttpAdapter for NativeHttpAdapter {
    fn request(&self, request: HttpRequest) -> AdapterFuture<'_, AdapterResult<HttpResponse>> {
        Box::pin(async move {
            self.lifecycle
                .require(PlatformErrorCode::HttpUnavailable, || self.probe())
                .await?;
            let native = self.native_request(&request);
            let url = native.url.clone();
            debug!(
                platform = self.platform.as_str(),
                method = native.method,
                url = url.as_str(),
                "sending native request"
            );
            let options = encode(self.platform, &native)?;
            let raw = self
                .bridge
                .invoke(HTTP, "request", options)
                .await
                .map_err(|e| map_bridge_error(self.platform, &HTTP_CODES, e))?;
            let native: NativeResponse = decode(self.platform, raw)?;
            let data = match native.data {
                Value::String(text) => parse_body(&text),
                other => other,
            };
            let response = HttpResponse {
                status: native.status,
                headers: native.headers,
                data,
                url: native.url.unwrap_or(url),
            };
            debug!(status = response.status, url = response.url.as_str(), "native response");
            ensure_success(self.platform, response)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chargepath_platform::{BridgeError, FallbackAction, HttpRequestConfig};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::native_bridge::RecordingNativeBridge;

    fn adapter(bridge: &Rc<RecordingNativeBridge>) -> NativeHttpAdapter {
        NativeHttpAdapter::new(
            Platform::Android,
            bridge.clone(),
            HttpDefaults {
                base_url: Some("https://api.chargepath.test".to_string()),
                ..HttpDefaults::default()
            },
        )
    }

    #[test]
    fn request_options_carry_merged_headers_params_and_timeouts() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[HTTP]));
        bridge.respond(
            HTTP,
            "request",
            Ok(json!({"status": 201, "headers": {}, "data": {"id": "s-1"}})),
        );
        let http = adapter(&bridge);

        let response = block_on(http.post(
            "sessions",
            Some(json!({"stationId": "DE-1"})),
            HttpRequestConfig::default()
                .param("dryRun", "true")
                .header("accept", "application/vnd.chargepath+json")
                .timeout(Duration::from_secs(5)),
        ))
        .expect("created");

        assert_eq!(response.status, 201);
        assert_eq!(response.data, json!({"id": "s-1"}));
        assert_eq!(response.url, "https://api.chargepath.test/sessions");
        assert_eq!(
            bridge.calls_to(HTTP, "request")[0].options,
            json!({
                "url": "https://api.chargepath.test/sessions",
                "method": "POST",
                "headers": {"accept": "application/vnd.chargepath+json"},
                "params": {"dryRun": "true"},
                "data": {"stationId": "DE-1"},
                "connectTimeout": 5000,
                "readTimeout": 5000,
                "responseType": "json",
            })
        );
    }

    #[test]
    fn text_bodies_are_parsed_when_they_hold_json() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[HTTP]));
        bridge.respond(
            HTTP,
            "request",
            Ok(json!({"status": 200, "data": "[1,2]", "url": "https://cdn.test/x"})),
        );
        let http = adapter(&bridge);

        let response =
            block_on(http.get("https://cdn.test/x", HttpRequestConfig::default())).expect("ok");

        assert_eq!(response.data, json!([1, 2]));
        assert_eq!(response.url, "https://cdn.test/x");
    }

    #[test]
    fn throttled_responses_are_recoverable_with_retry_after() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[HTTP]));
        bridge.respond(
            HTTP,
            "request",
            Ok(json!({"status": 429, "headers": {"Retry-After": "7"}, "data": null})),
        );
        let http = adapter(&bridge);

        let err = block_on(http.get("stations", HttpRequestConfig::default())).expect_err("429");

        assert_eq!(err.code, PlatformErrorCode::HttpStatus);
        assert!(err.recoverable);
        assert_eq!(
            err.fallback,
            Some(FallbackAction::RetryAfter(Duration::from_secs(7)))
        );
    }

    #[test]
    fn native_timeouts_map_to_http_timeout() {
        let bridge = Rc::new(RecordingNativeBridge::with_plugins(&[HTTP]));
        bridge.respond(
            HTTP,
            "request",
            Err(BridgeError::new("The request timed out.")),
        );
        let http = adapter(&bridge);

        let err = block_on(http.delete("sessions/1", HttpRequestConfig::default()))
            .expect_err("timeout");

        assert_eq!(err.code, PlatformErrorCode::HttpTimeout);
        assert!(err.recoverable);
    }
}
