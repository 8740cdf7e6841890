//! Caller-side retry with linear or exponential backoff.
//!
//! Adapters never retry on their own; callers opt in by wrapping an operation with
//! [`with_retry`].

use std::{future::Future, pin::Pin, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `delay * n` after the n-th failure.
    Linear,
    /// `delay * 2^(n-1)` after the n-th failure.
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryOptions {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Base delay in milliseconds.
    pub delay_ms: u64,
    /// Upper bound for a single delay in milliseconds.
    pub max_delay_ms: u64,
    /// Delay growth between attempts.
    pub backoff: Backoff,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff: Backoff::Exponential,
        }
    }
}

impl RetryOptions {
    /// Delay to wait after the `failed_attempt`-th failure (1-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let n = failed_attempt.max(1);
        let millis = match self.backoff {
            Backoff::Linear => self.delay_ms.saturating_mul(u64::from(n)),
            Backoff::Exponential => self
                .delay_ms
                .saturating_mul(1_u64 << (n - 1).min(32)),
        };
        Duration::from_millis(millis.min(self.max_delay_ms))
    }
}

/// Boxed future returned by [`Timer::sleep`].
pub type TimerFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

/// Source of backoff delays.
pub trait Timer {
    /// Completes after `duration`.
    fn sleep(&self, duration: Duration) -> TimerFuture<'_>;
}

/// Host timer: `setTimeout` on `wasm32`, a detached timer thread elsewhere.
///
/// Neither variant blocks the executor thread while waiting. When no host timer can be scheduled
/// the sleep completes immediately and a warning is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTimer;

impl Timer for HostTimer {
    fn sleep(&self, duration: Duration) -> TimerFuture<'_> {
        Box::pin(async move {
            if duration.is_zero() {
                return;
            }

            #[cfg(target_arch = "wasm32")]
            {
                let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
                let mut failure = None;
                let promise = js_sys::Promise::new(&mut |resolve, _reject| {
                    failure = schedule_timeout(&resolve, millis).err();
                });
                if let Some(err) = failure {
                    warn!(error = ?err, "setTimeout unavailable, skipping backoff delay");
                    return;
                }
                let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
            }

            #[cfg(not(target_arch = "wasm32"))]
            {
                let (fired, elapsed) = futures::channel::oneshot::channel::<()>();
                let spawned = std::thread::Builder::new()
                    .name("chargepath-timer".to_string())
                    .spawn(move || {
                        std::thread::sleep(duration);
                        let _ = fired.send(());
                    });
                match spawned {
                    Ok(_) => {
                        let _ = elapsed.await;
                    }
                    Err(err) => {
                        warn!(error = %err, "timer thread unavailable, skipping backoff delay");
                    }
                }
            }
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn schedule_timeout(
    resolve: &js_sys::Function,
    millis: i32,
) -> Result<(), wasm_bindgen::JsValue> {
    use wasm_bindgen::JsCast;

    if let Some(window) = web_sys::window() {
        return window
            .set_timeout_with_callback_and_timeout_and_arguments_0(resolve, millis)
            .map(|_| ());
    }
    // Workers and other window-less scopes still expose `setTimeout` on the global object.
    let global = js_sys::global();
    let set_timeout: js_sys::Function =
        js_sys::Reflect::get(&global, &wasm_bindgen::JsValue::from_str("setTimeout"))?
            .dyn_into()?;
    set_timeout
        .call2(&global, resolve, &wasm_bindgen::JsValue::from(millis))
        .map(|_| ())
}

/// Runs `operation` until it succeeds or `options.max_attempts` is reached.
///
/// On exhaustion the `fallback` result is returned when supplied, otherwise the last error.
///
/// # Errors
///
/// Returns the last operation error when every attempt failed and no fallback was supplied, or
/// the fallback's own error.
pub async fn with_retry<T, E, Op, Fut, Fb, FbFut>(
    options: &RetryOptions,
    timer: &dyn Timer,
    mut operation: Op,
    fallback: Option<Fb>,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Fb: FnOnce() -> FbFut,
    FbFut: Future<Output = Result<T, E>>,
{
    let attempts = options.max_attempts.max(1);
    let mut attempt = 1;
    let last_error = loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                let delay = options.delay_after(attempt);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed, retrying"
                );
                timer.sleep(delay).await;
                attempt += 1;
            }
            Err(err) => break err,
        }
    };

    match fallback {
        Some(fallback) => {
            warn!(attempts, error = %last_error, "retries exhausted, using fallback");
            fallback().await
        }
        None => {
            warn!(attempts, error = %last_error, "retries exhausted");
            Err(last_error)
        }
    }
}
