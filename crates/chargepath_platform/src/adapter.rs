//! Adapter lifecycle shared by every capability contract.

use std::{cell::RefCell, future::Future, pin::Pin};

use futures::channel::oneshot;
use tracing::{debug, warn};

use crate::{
    error::{PlatformError, PlatformErrorCode},
    platform::{CapabilitySubset, Platform},
};

/// Object-safe boxed future used by adapter methods.
pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, PlatformError>;

/// Resolved lifecycle state of one adapter instance.
///
/// `Available` and `Unavailable` are terminal; a fresh instance is the only way back to
/// `Uninitialized`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdapterState {
    /// `initialize` has not completed yet.
    #[default]
    Uninitialized,
    /// The underlying API answered the availability probe.
    Available,
    /// The underlying API is missing or the probe failed.
    Unavailable(String),
}

impl AdapterState {
    /// Returns whether the adapter can serve operations.
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Returns whether initialization has resolved.
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    /// Builds a state from a probe outcome.
    pub fn from_probe(outcome: Result<(), String>) -> Self {
        match outcome {
            Ok(()) => Self::Available,
            Err(reason) => Self::Unavailable(reason),
        }
    }
}

/// Lazily-resolved lifecycle cell owned by an adapter instance.
///
/// At most one probe runs at a time. Callers arriving while it is in flight wait for its
/// outcome instead of probing again.
pub struct AdapterLifecycle {
    name: &'static str,
    platform: Platform,
    state: RefCell<AdapterState>,
    /// `Some` while a probe is in flight; holds callers waiting for its outcome.
    waiters: RefCell<Option<Vec<oneshot::Sender<AdapterState>>>>,
}

impl std::fmt::Debug for AdapterLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterLifecycle")
            .field("name", &self.name)
            .field("platform", &self.platform)
            .field("state", &*self.state.borrow())
            .field("probing", &self.waiters.borrow().is_some())
            .finish()
    }
}

/// Marks a probe as in flight and hands the recorded state to waiters when dropped.
///
/// A probe dropped before completion leaves the lifecycle `Uninitialized`, so waiters see that
/// state and the next caller probes again.
struct ProbeInFlight<'a>(&'a AdapterLifecycle);

impl Drop for ProbeInFlight<'_> {
    fn drop(&mut self) {
        let waiters = self.0.waiters.borrow_mut().take().unwrap_or_default();
        let state = self.0.state();
        for waiter in waiters {
            let _ = waiter.send(state.clone());
        }
    }
}

impl AdapterLifecycle {
    /// Creates an uninitialized lifecycle for the adapter `name` on `platform`.
    pub fn new(name: &'static str, platform: Platform) -> Self {
        Self {
            name,
            platform,
            state: RefCell::new(AdapterState::Uninitialized),
            waiters: RefCell::new(None),
        }
    }

    /// Adapter name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Platform the adapter serves.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Returns the current state.
    pub fn state(&self) -> AdapterState {
        self.state.borrow().clone()
    }

    /// Runs `probe` on first use and records its outcome.
    ///
    /// Later calls return the recorded state without probing again, and calls made while the
    /// probe is in flight await its outcome. The probe reports failure through its `Err` value;
    /// nothing is propagated.
    pub async fn ensure<F, Fut>(&self, probe: F) -> AdapterState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let current = self.state();
        if current.is_resolved() {
            return current;
        }
        let in_flight = {
            let mut waiters = self.waiters.borrow_mut();
            match waiters.as_mut() {
                Some(queue) => {
                    let (tx, rx) = oneshot::channel();
                    queue.push(tx);
                    Some(rx)
                }
                None => {
                    *waiters = Some(Vec::new());
                    None
                }
            }
        };
        if let Some(outcome) = in_flight {
            return outcome.await.unwrap_or_else(|_| self.state());
        }

        let _guard = ProbeInFlight(self);
        let resolved = AdapterState::from_probe(probe().await);
        match &resolved {
            AdapterState::Available => {
                debug!(adapter = self.name, platform = self.platform.as_str(), "adapter available");
            }
            AdapterState::Unavailable(reason) => {
                warn!(
                    adapter = self.name,
                    platform = self.platform.as_str(),
                    reason = reason.as_str(),
                    "adapter unavailable"
                );
            }
            AdapterState::Uninitialized => {}
        }
        *self.state.borrow_mut() = resolved.clone();
        resolved
    }

    /// Ensures initialization, then fails with `code` when the adapter is unavailable.
    ///
    /// # Errors
    ///
    /// Returns a non-recoverable [`PlatformError`] tagged with `code` when the probe failed.
    pub async fn require<F, Fut>(&self, code: PlatformErrorCode, probe: F) -> AdapterResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        match self.ensure(probe).await {
            AdapterState::Available => Ok(()),
            AdapterState::Unavailable(reason) => {
                Err(PlatformError::new(self.platform, code, reason))
            }
            AdapterState::Uninitialized => Err(PlatformError::new(
                self.platform,
                code,
                format!("{} adapter did not initialize", self.name),
            )),
        }
    }
}

/// Lifecycle surface shared by every capability adapter.
pub trait PlatformAdapter {
    /// Platform the adapter serves.
    fn platform(&self) -> Platform;

    /// Probes availability once. Idempotent and never fails.
    fn initialize(&self) -> AdapterFuture<'_, AdapterState>;

    /// Returns the current lifecycle state without probing.
    fn state(&self) -> AdapterState;

    /// Returns whether the last resolved probe succeeded.
    fn is_available(&self) -> bool {
        self.state().is_available()
    }

    /// Returns the capability flags this adapter can speak to.
    fn capabilities(&self) -> CapabilitySubset;
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;

    use super::*;

    #[test]
    fn probe_runs_once_and_state_is_terminal() {
        let lifecycle = AdapterLifecycle::new("storage", Platform::Web);
        let probes = Cell::new(0);

        let first = block_on(lifecycle.ensure(|| {
            probes.set(probes.get() + 1);
            async { Ok(()) }
        }));
        let second = block_on(lifecycle.ensure(|| {
            probes.set(probes.get() + 1);
            async { Err("should not run".to_string()) }
        }));

        assert_eq!(first, AdapterState::Available);
        assert_eq!(second, AdapterState::Available);
        assert_eq!(probes.get(), 1);
    }

    #[test]
    fn concurrent_first_callers_share_one_availability_check() {
        let lifecycle = AdapterLifecycle::new("storage", Platform::Web);
        let probes = Cell::new(0);
        let (release, released) = oneshot::channel::<()>();

        let (first, second, ()) = block_on(async {
            futures::join!(
                lifecycle.ensure(|| {
                    probes.set(probes.get() + 1);
                    async move { released.await.map_err(|_| "probe released early".to_string()) }
                }),
                lifecycle.ensure(|| {
                    probes.set(probes.get() + 1);
                    async { Err("second probe".to_string()) }
                }),
                async {
                    let _ = release.send(());
                },
            )
        });

        assert_eq!(probes.get(), 1);
        assert_eq!(first, AdapterState::Available);
        assert_eq!(second, AdapterState::Available);
    }

    #[test]
    fn cancelled_initialization_leaves_the_lifecycle_uninitialized() {
        let lifecycle = AdapterLifecycle::new("camera", Platform::Ios);
        {
            let mut stalled =
                Box::pin(lifecycle.ensure(futures::future::pending::<Result<(), String>>));
            assert!(block_on(async { futures::poll!(stalled.as_mut()) }).is_pending());
        }

        assert_eq!(lifecycle.state(), AdapterState::Uninitialized);
        assert_eq!(
            block_on(lifecycle.ensure(|| async { Ok(()) })),
            AdapterState::Available
        );
    }

    #[test]
    fn require_maps_unavailable_to_typed_error() {
        let lifecycle = AdapterLifecycle::new("camera", Platform::Web);
        let err = block_on(lifecycle.require(PlatformErrorCode::CameraUnsupported, || async {
            Err("mediaDevices missing".to_string())
        }))
        .expect_err("unavailable");

        assert_eq!(err.code, PlatformErrorCode::CameraUnsupported);
        assert_eq!(err.platform, Platform::Web);
        assert_eq!(err.message, "mediaDevices missing");
        assert_eq!(
            lifecycle.state(),
            AdapterState::Unavailable("mediaDevices missing".to_string())
        );
    }
}
