//! Generic HTTP capability contract.

use std::{collections::BTreeMap, time::Duration};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    adapter::{AdapterFuture, AdapterResult, PlatformAdapter},
    error::{FallbackAction, PlatformError, PlatformErrorCode},
    platform::Platform,
};

/// HTTP verb supported by [`HttpAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the verb as sent on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Per-request configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpRequestConfig {
    /// Extra request headers. Override configured defaults with the same name.
    pub headers: BTreeMap<String, String>,
    /// Query parameters appended to the URL.
    pub params: BTreeMap<String, String>,
    /// Request timeout. Falls back to the adapter default when `None`.
    pub timeout: Option<Duration>,
}

impl HttpRequestConfig {
    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request verb.
    pub method: HttpMethod,
    /// Absolute URL, or a path resolved against the configured base URL.
    pub url: String,
    /// JSON body for `POST`/`PUT`.
    pub body: Option<Value>,
    /// Per-request headers, query parameters, and timeout.
    pub config: HttpRequestConfig,
}

impl HttpRequest {
    /// Creates a request without body or extra configuration.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            config: HttpRequestConfig::default(),
        }
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Replaces the request configuration.
    pub fn with_config(mut self, config: HttpRequestConfig) -> Self {
        self.config = config;
        self
    }
}

/// Response returned by [`HttpAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, or the raw text as a JSON string when the body is not JSON.
    pub data: Value,
    /// Final URL after redirects.
    pub url: String,
}

impl HttpResponse {
    /// Returns whether the status is 2xx.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Deserializes the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformErrorCode::InvalidPayload`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, platform: Platform) -> AdapterResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            PlatformError::new(platform, PlatformErrorCode::InvalidPayload, e.to_string())
        })
    }
}

/// Generic HTTP transport. Endpoint semantics belong to callers.
pub trait HttpAdapter: PlatformAdapter {
    /// Sends `request`.
    ///
    /// Non-2xx responses fail with [`PlatformErrorCode::HttpStatus`].
    fn request(&self, request: HttpRequest) -> AdapterFuture<'_, AdapterResult<HttpResponse>>;

    /// Sends a `GET`.
    fn get(
        &self,
        url: &str,
        config: HttpRequestConfig,
    ) -> AdapterFuture<'_, AdapterResult<HttpResponse>> {
        self.request(HttpRequest::new(HttpMethod::Get, url).with_config(config))
    }

    /// Sends a `POST` with an optional JSON body.
    fn post(
        &self,
        url: &str,
        body: Option<Value>,
        config: HttpRequestConfig,
    ) -> AdapterFuture<'_, AdapterResult<HttpResponse>> {
        let mut request = HttpRequest::new(HttpMethod::Post, url).with_config(config);
        request.body = body;
        self.request(request)
    }

    /// Sends a `PUT` with an optional JSON body.
    fn put(
        &self,
        url: &str,
        body: Option<Value>,
        config: HttpRequestConfig,
    ) -> AdapterFuture<'_, AdapterResult<HttpResponse>> {
        let mut request = HttpRequest::new(HttpMethod::Put, url).with_config(config);
        request.body = body;
        self.request(request)
    }

    /// Sends a `DELETE`.
    fn delete(
        &self,
        url: &str,
        config: HttpRequestConfig,
    ) -> AdapterFuture<'_, AdapterResult<HttpResponse>> {
        self.request(HttpRequest::new(HttpMethod::Delete, url).with_config(config))
    }
}

/// Resolves `url` against an optional base URL.
///
/// Absolute `http(s)://` URLs are returned unchanged; the scheme is matched case-insensitively.
/// Relative paths are joined with exactly one slash between base and path.
pub fn resolve_url(base_url: Option<&str>, url: &str) -> String {
    let has_scheme = |scheme: &str| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    };
    if has_scheme("http://") || has_scheme("https://") {
        return url.to_string();
    }
    match base_url {
        Some(base) if !base.is_empty() => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ),
        _ => url.to_string(),
    }
}

/// Merges configured default headers with request headers. Request headers win, compared
/// case-insensitively.
pub fn merge_headers(
    defaults: &BTreeMap<String, String>,
    request: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = defaults
        .iter()
        .filter(|(name, _)| {
            !request
                .keys()
                .any(|candidate| candidate.eq_ignore_ascii_case(name))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    merged.extend(request.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Parses a response body as JSON, falling back to a JSON string of the raw text.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Turns non-2xx responses into [`PlatformErrorCode::HttpStatus`] errors.
///
/// `408`, `429`, and `5xx` are recoverable; `429`/`503` carry the `Retry-After` delay when the
/// header holds a number of seconds.
///
/// # Errors
///
/// Returns the status error for any non-2xx response.
pub fn ensure_success(platform: Platform, response: HttpResponse) -> AdapterResult<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let status = response.status;
    let mut err = PlatformError::new(
        platform,
        PlatformErrorCode::HttpStatus,
        format!("{} responded with status {status}", response.url),
    );
    if status == 408 || status == 429 || status >= 500 {
        err = err.recoverable();
        let retry_after = response
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
            .and_then(|(_, value)| value.trim().parse::<u64>().ok());
        if let Some(seconds) = retry_after {
            err = err.with_fallback(FallbackAction::RetryAfter(Duration::from_secs(seconds)));
        }
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn response(status: u16, headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            data: Value::Null,
            url: "https://api.example.test/stations".to_string(),
        }
    }

    #[test]
    fn resolve_url_joins_base_and_path() {
        let base = Some("https://api.example.test/v1/");
        assert_eq!(
            resolve_url(base, "/stations"),
            "https://api.example.test/v1/stations"
        );
        assert_eq!(
            resolve_url(base, "https://other.test/x"),
            "https://other.test/x"
        );
        assert_eq!(resolve_url(None, "/stations"), "/stations");
    }

    #[test]
    fn absolute_urls_are_detected_regardless_of_scheme_case() {
        let base = Some("https://api.example.test/v1");
        assert_eq!(
            resolve_url(base, "HTTPS://tiles.example.test/z12"),
            "HTTPS://tiles.example.test/z12"
        );
        assert_eq!(
            resolve_url(base, "Http://legacy.example.test"),
            "Http://legacy.example.test"
        );
        assert_eq!(resolve_url(base, "h"), "https://api.example.test/v1/h");
    }

    #[test]
    fn request_headers_override_defaults_case_insensitively() {
        let defaults: BTreeMap<_, _> = [
            ("Accept".to_string(), "application/json".to_string()),
            ("X-Client".to_string(), "chargepath".to_string()),
        ]
        .into_iter()
        .collect();
        let request: BTreeMap<_, _> = [("accept".to_string(), "text/plain".to_string())]
            .into_iter()
            .collect();

        let merged = merge_headers(&defaults, &request);
        assert_eq!(merged.get("accept").map(String::as_str), Some("text/plain"));
        assert_eq!(merged.get("Accept"), None);
        assert_eq!(merged.get("X-Client").map(String::as_str), Some("chargepath"));
    }

    #[test]
    fn body_parsing_falls_back_to_text() {
        assert_eq!(parse_body("{\"ok\":true}"), json!({"ok": true}));
        assert_eq!(parse_body("plain"), json!("plain"));
        assert_eq!(parse_body("  "), Value::Null);
    }

    #[test]
    fn server_errors_are_recoverable_with_retry_after() {
        let err = ensure_success(Platform::Web, response(503, &[("Retry-After", "7")]))
            .expect_err("503");
        assert_eq!(err.code, PlatformErrorCode::HttpStatus);
        assert!(err.recoverable);
        assert_eq!(
            err.fallback,
            Some(FallbackAction::RetryAfter(Duration::from_secs(7)))
        );
    }

    #[test]
    fn client_errors_are_not_recoverable() {
        let err = ensure_success(Platform::Ios, response(404, &[])).expect_err("404");
        assert!(!err.recoverable);
        assert!(ensure_success(Platform::Ios, response(204, &[])).is_ok());
    }
}
