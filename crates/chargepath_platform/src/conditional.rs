//! Two-branch (web vs. native) module selection.
//!
//! A [`PlatformModule`] packages a web factory and a native factory. Only the factory matching
//! [`PlatformDetector::is_native`] is ever invoked.

use std::{collections::BTreeMap, future::Future, pin::Pin};

use futures::future::join_all;
use tracing::warn;

use crate::{
    detector::PlatformDetector,
    error::{ImportBranch, ImportFailure, PlatformImportError},
};

/// Boxed future produced by a module factory.
pub type ImportFuture<T> = Pin<Box<dyn Future<Output = Result<T, ImportFailure>>>>;

type Factory<T> = Box<dyn Fn() -> ImportFuture<T>>;

/// Web and native factories for one module.
pub struct PlatformModule<T> {
    web: Factory<T>,
    native: Factory<T>,
}

impl<T> std::fmt::Debug for PlatformModule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformModule").finish_non_exhaustive()
    }
}

impl<T: 'static> PlatformModule<T> {
    /// Invokes the web factory.
    pub fn web(&self) -> ImportFuture<T> {
        (self.web)()
    }

    /// Invokes the native factory.
    pub fn native(&self) -> ImportFuture<T> {
        (self.native)()
    }

    fn load(&self, branch: ImportBranch) -> ImportFuture<T> {
        match branch {
            ImportBranch::Web => self.web(),
            ImportBranch::Native => self.native(),
        }
    }
}

/// Packages two async factories into a [`PlatformModule`].
pub fn create_platform_adapter<T, W, WFut, N, NFut>(web: W, native: N) -> PlatformModule<T>
where
    T: 'static,
    W: Fn() -> WFut + 'static,
    WFut: Future<Output = Result<T, ImportFailure>> + 'static,
    N: Fn() -> NFut + 'static,
    NFut: Future<Output = Result<T, ImportFailure>> + 'static,
{
    PlatformModule {
        web: Box::new(move || -> ImportFuture<T> { Box::pin(web()) }),
        native: Box::new(move || -> ImportFuture<T> { Box::pin(native()) }),
    }
}

fn selected_branch(detector: &PlatformDetector) -> ImportBranch {
    if detector.is_native() {
        ImportBranch::Native
    } else {
        ImportBranch::Web
    }
}

/// Loads the branch matching the detected platform.
///
/// # Errors
///
/// Wraps a factory failure in [`PlatformImportError`] tagged with the attempted branch.
pub async fn conditional_import<T: 'static>(
    detector: &PlatformDetector,
    module: &PlatformModule<T>,
) -> Result<T, PlatformImportError> {
    let branch = selected_branch(detector);
    module
        .load(branch)
        .await
        .map_err(|original_error| PlatformImportError {
            platform: branch,
            original_error,
        })
}

/// Like [`conditional_import`], but serves `fallback` when the selected branch fails.
///
/// # Errors
///
/// Returns the wrapped branch error when no fallback is supplied, or the wrapped fallback error
/// when the fallback itself fails.
pub async fn conditional_import_with_fallback<T, F, Fut>(
    detector: &PlatformDetector,
    module: &PlatformModule<T>,
    fallback: Option<F>,
) -> Result<T, PlatformImportError>
where
    T: 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ImportFailure>>,
{
    match conditional_import(detector, module).await {
        Ok(value) => Ok(value),
        Err(err) => {
            let Some(fallback) = fallback else {
                return Err(err);
            };
            warn!(
                branch = err.platform.as_str(),
                error = %err.original_error,
                "platform module failed to load, using fallback"
            );
            fallback()
                .await
                .map_err(|original_error| PlatformImportError {
                    platform: err.platform,
                    original_error,
                })
        }
    }
}

/// Returns whether the module for the detected platform loads without error.
pub async fn is_platform_module_available<T: 'static>(
    detector: &PlatformDetector,
    module: &PlatformModule<T>,
) -> bool {
    conditional_import(detector, module).await.is_ok()
}

/// Loads every module concurrently. Failed entries map to `None` without affecting siblings.
pub async fn batch_conditional_import<K, T>(
    detector: &PlatformDetector,
    modules: BTreeMap<K, PlatformModule<T>>,
) -> BTreeMap<K, Option<T>>
where
    K: Ord + std::fmt::Debug,
    T: 'static,
{
    let (names, modules): (Vec<K>, Vec<PlatformModule<T>>) = modules.into_iter().unzip();
    let results = join_all(
        modules
            .iter()
            .map(|module| conditional_import(detector, module)),
    )
    .await;

    names
        .into_iter()
        .zip(results)
        .map(|(name, result)| match result {
            Ok(value) => (name, Some(value)),
            Err(err) => {
                warn!(module = ?name, error = %err, "platform module import failed");
                (name, None)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use futures::executor::block_on;

    use super::*;
    use crate::environment::StaticEnvironment;

    #[derive(Debug, thiserror::Error)]
    #[error("chunk failed to load: {0}")]
    struct ChunkLoadError(&'static str);

    fn detector(native: bool) -> PlatformDetector {
        let env = if native {
            StaticEnvironment::native("android")
        } else {
            StaticEnvironment::full_browser()
        };
        PlatformDetector::new(Rc::new(env))
    }

    fn counting_module(
        web_calls: Rc<Cell<u32>>,
        native_calls: Rc<Cell<u32>>,
    ) -> PlatformModule<&'static str> {
        create_platform_adapter(
            move || {
                web_calls.set(web_calls.get() + 1);
                async { Ok("web") }
            },
            move || {
                native_calls.set(native_calls.get() + 1);
                async { Ok("native") }
            },
        )
    }

    fn failing_module() -> PlatformModule<&'static str> {
        create_platform_adapter(
            || async { Err::<&'static str, ImportFailure>(Box::new(ChunkLoadError("web"))) },
            || async { Err::<&'static str, ImportFailure>(Box::new(ChunkLoadError("native"))) },
        )
    }

    #[test]
    fn web_platform_invokes_only_web_factory() {
        let (web, native) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let module = counting_module(web.clone(), native.clone());

        let loaded = block_on(conditional_import(&detector(false), &module)).expect("import");
        assert_eq!(loaded, "web");
        assert_eq!((web.get(), native.get()), (1, 0));
    }

    #[test]
    fn native_platform_invokes_only_native_factory() {
        let (web, native) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let module = counting_module(web.clone(), native.clone());

        let loaded = block_on(conditional_import(&detector(true), &module)).expect("import");
        assert_eq!(loaded, "native");
        assert_eq!((web.get(), native.get()), (0, 1));
    }

    #[test]
    fn configured_native_override_selects_native_factory_in_a_browser() {
        let config = crate::config::PlatformConfig::from_json_str(
            r#"{"platformOverride": "android"}"#,
        )
        .expect("valid config");
        let detector = PlatformDetector::with_override(
            Rc::new(StaticEnvironment::full_browser()),
            config.effective_platform_override(),
        );
        let (web, native) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let module = counting_module(web.clone(), native.clone());

        let loaded = block_on(conditional_import(&detector, &module)).expect("import");
        assert_eq!(loaded, "native");
        assert_eq!((web.get(), native.get()), (0, 1));
        assert!(detector.platform().is_native());
    }

    #[test]
    fn failures_are_wrapped_with_branch_and_original_error() {
        let err = block_on(conditional_import(&detector(true), &failing_module()))
            .expect_err("native branch fails");
        assert_eq!(err.platform, ImportBranch::Native);
        let original = err
            .original_error
            .downcast_ref::<ChunkLoadError>()
            .expect("original error preserved");
        assert_eq!(original.0, "native");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn fallback_result_is_served_when_branch_fails() {
        let loaded = block_on(conditional_import_with_fallback(
            &detector(false),
            &failing_module(),
            Some(|| async { Ok::<_, ImportFailure>("fallback") }),
        ))
        .expect("fallback");
        assert_eq!(loaded, "fallback");
    }

    #[test]
    fn missing_fallback_rethrows_wrapped_error() {
        let err = block_on(conditional_import_with_fallback(
            &detector(false),
            &failing_module(),
            None::<fn() -> ImportFuture<&'static str>>,
        ))
        .expect_err("no fallback");
        assert_eq!(err.platform, ImportBranch::Web);
    }

    #[test]
    fn availability_reflects_import_outcome() {
        let (web, native) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        assert!(block_on(is_platform_module_available(
            &detector(false),
            &counting_module(web, native)
        )));
        assert!(!block_on(is_platform_module_available(
            &detector(false),
            &failing_module()
        )));
    }

    #[test]
    fn batch_import_records_failures_as_none() {
        let (web, native) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let mut modules = BTreeMap::new();
        modules.insert("maps", counting_module(web, native));
        modules.insert("camera", failing_module());

        let loaded = block_on(batch_conditional_import(&detector(false), modules));
        assert_eq!(loaded.get("maps"), Some(&Some("web")));
        assert_eq!(loaded.get("camera"), Some(&None));
    }
}
