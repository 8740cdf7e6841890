//! HTTP over `reqwest` (the Fetch API when compiled for `wasm32`).

use std::{collections::BTreeMap, rc::Rc, time::Duration};

use chargepath_platform::{
    ensure_success, merge_headers, parse_body, resolve_url, AdapterFuture, AdapterLifecycle,
    AdapterResult, AdapterState, BrowserApi, CapabilitySubset, HostEnvironment, HttpAdapter,
    HttpDefaults, HttpMethod, HttpRequest, HttpResponse, Platform, PlatformAdapter, PlatformError,
    PlatformErrorCode,
};
use tracing::debug;

/// Browser HTTP adapter.
pub struct WebHttpAdapter {
    env: Rc<dyn HostEnvironment>,
    defaults: HttpDefaults,
    client: reqwest::Client,
    lifecycle: AdapterLifecycle,
}

enum SendFailure {
    TimedOut(Duration),
    Transport(reqwest::Error),
}

impl WebHttpAdapter {
    /// Creates an uninitialized adapter using `defaults` for base URL, timeout, and headers.
    pub fn new(env: Rc<dyn HostEnvironment>, defaults: HttpDefaults) -> Self {
        Self {
            env,
            defaults,
            client: reqwest::Client::new(),
            lifecycle: AdapterLifecycle::new("http", Platform::Web),
        }
    }

    /// Defaults applied to every request.
    pub fn defaults(&self) -> &HttpDefaults {
        &self.defaults
    }

    async fn probe(&self) -> Result<(), String> {
        if self.env.has_api(BrowserApi::Fetch) {
            Ok(())
        } else {
            Err("fetch is not available".to_string())
        }
    }

    fn timeout_for(&self, request: &HttpRequest) -> Duration {
        request
            .config
            .timeout
            .unwrap_or_else(|| self.defaults.timeout())
    }

    /// Builds the `reqwest` request with base URL, query, merged headers, and JSON body applied.
    pub(crate) fn build(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let url = resolve_url(self.defaults.base_url.as_deref(), &request.url);
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, url);
        if !request.config.params.is_empty() {
            builder = builder.query(&request.config.params);
        }
        for (name, value) in merge_headers(&self.defaults.default_headers, &request.config.headers)
        {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder
                .timeout(self.timeout_for(request))
                .header(
                    "User-Agent",
                    format!("chargepath/{}", env!("CARGO_PKG_VERSION")),
                );
        }
        builder
    }

    async fn send(
        builder: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<reqwest::Response, SendFailure> {
        #[cfg(target_arch = "wasm32")]
        {
            use chargepath_platform::{HostTimer, Timer};
            use futures::future::{select, Either};

            let timer = HostTimer;
            match select(Box::pin(builder.send()), timer.sleep(timeout)).await {
                Either::Left((result, _)) => result.map_err(SendFailure::Transport),
                Either::Right(_) => Err(SendFailure::TimedOut(timeout)),
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            builder.send().await.map_err(|err| {
                if err.is_timeout() {
                    SendFailure::TimedOut(timeout)
                } else {
                    SendFailure::Transport(err)
                }
            })
        }
    }
}

impl std::fmt::Debug for WebHttpAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebHttpAdapter")
            .field("defaults", &self.defaults)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

fn send_error(url: &str, failure: SendFailure) -> PlatformError {
    match failure {
        SendFailure::TimedOut(timeout) => PlatformError::new(
            Platform::Web,
            PlatformErrorCode::HttpTimeout,
            format!("{url} did not respond within {}ms", timeout.as_millis()),
        )
        .recoverable(),
        SendFailure::Transport(err) => PlatformError::new(
            Platform::Web,
            PlatformErrorCode::HttpRequestFailed,
            format!("request to {url} failed: {err}"),
        )
        .recoverable(),
    }
}

async fn read_response(response: reqwest::Response) -> AdapterResult<HttpResponse> {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let text = response.text().await.map_err(|e| {
        PlatformError::new(
            Platform::Web,
            PlatformErrorCode::HttpRequestFailed,
            format!("failed to read response body from {url}: {e}"),
        )
        .recoverable()
    })?;
    Ok(HttpResponse {
        status,
        headers,
        data: parse_body(&text),
        url,
    })
}

impl PlatformAdapter for WebHttpAdapter {
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
        CapabilitySubset {
            has_network: Some(self.is_available()),
            ..CapabilitySubset::default()
        }
    }
}

impl HttpAdapter for WebHttpAdapter {
    fn request(&self, request: HttpRequest) -> AdapterFuture<'_, AdapterResult<HttpResponse>> {
        Box::pin(async move {
            self.lifecycle
                .require(PlatformErrorCode::HttpUnavailable, || self.probe())
                .await?;
            let url = resolve_url(self.defaults.base_url.as_deref(), &request.url);
            let timeout = self.timeout_for(&request);
            debug!(method = request.method.as_str(), url = url.as_str(), "sending request");
            let response = Self::send(self.build(&request), timeout)
                .await
                .map_err(|failure| send_error(&url, failure))?;
            let response = read_response(response).await?;
            debug!(status = response.status, url = url.as_str(), "response received");
            ensure_success(Platform::Web, response)
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use chargepath_platform::{HttpRequestConfig, StaticEnvironment};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn adapter(env: StaticEnvironment) -> WebHttpAdapter {
        WebHttpAdapter::new(
            Rc::new(env),
            HttpDefaults {
                base_url: Some("https://api.chargepath.test/v2/".to_string()),
                ..HttpDefaults::default()
            },
        )
    }

    #[test]
    fn build_applies_base_url_query_and_header_overrides() {
        let http = adapter(StaticEnvironment::full_browser());
        let request = HttpRequest::new(HttpMethod::Post, "/routes/plan")
            .with_body(json!({"from": "Berlin", "to": "Munich"}))
            .with_config(
                HttpRequestConfig::default()
                    .param("connector", "ccs")
                    .param("minKw", "150")
                    .header("accept", "application/geo+json"),
            );

        let built = http.build(&request).build().expect("valid request");

        assert_eq!(built.method(), reqwest::Method::POST);
        assert_eq!(
            built.url().as_str(),
            "https://api.chargepath.test/v2/routes/plan?connector=ccs&minKw=150"
        );
        assert_eq!(
            built.headers().get("accept").and_then(|v| v.to_str().ok()),
            Some("application/geo+json")
        );
        assert_eq!(built.headers().get_all("accept").iter().count(), 1);
        assert_eq!(
            built.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(built.timeout(), Some(&Duration::from_secs(30)));
    }

    #[test]
    fn per_request_timeout_overrides_default() {
        let http = adapter(StaticEnvironment::full_browser());
        let request = HttpRequest::new(HttpMethod::Get, "https://tiles.chargepath.test/1/2/3")
            .with_config(HttpRequestConfig::default().timeout(Duration::from_millis(2_500)));

        let built = http.build(&request).build().expect("valid request");

        assert_eq!(built.url().as_str(), "https://tiles.chargepath.test/1/2/3");
        assert_eq!(built.timeout(), Some(&Duration::from_millis(2_500)));
    }

    #[test]
    fn missing_fetch_fails_with_http_unavailable() {
        let http = adapter(StaticEnvironment::headless());

        let err = block_on(http.get("/stations", HttpRequestConfig::default()))
            .expect_err("unavailable");

        assert_eq!(err.code, PlatformErrorCode::HttpUnavailable);
        assert!(matches!(http.state(), AdapterState::Unavailable(_)));
    }

    #[test]
    fn send_failures_are_recoverable() {
        let timeout = send_error("https://x.test", SendFailure::TimedOut(Duration::from_secs(1)));
        assert_eq!(timeout.code, PlatformErrorCode::HttpTimeout);
        assert!(timeout.recoverable);
    }
}
