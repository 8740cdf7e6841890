//! Live host-environment probe.

use chargepath_platform::{BrowserApi, HostEnvironment};

/// [`HostEnvironment`] backed by the real JavaScript globals.
///
/// On non-`wasm32` targets there is no window, so every probe reports absence and the detector
/// resolves to the web platform with no capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserEnvironment;

impl HostEnvironment for BrowserEnvironment {
    fn has_window(&self) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            web_sys::window().is_some()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            false
        }
    }

    fn has_native_bridge(&self) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            imp::call_capacitor("isNativePlatform")
                .and_then(|value| value.as_bool())
                .unwrap_or(false)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            false
        }
    }

    fn native_bridge_platform(&self) -> Option<String> {
        #[cfg(target_arch = "wasm32")]
        {
            imp::call_capacitor("getPlatform").and_then(|value| value.as_string())
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            None
        }
    }

    fn user_agent(&self) -> Option<String> {
        #[cfg(target_arch = "wasm32")]
        {
            web_sys::window()?.navigator().user_agent().ok()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            None
        }
    }

    fn has_api(&self, api: BrowserApi) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            match api {
                BrowserApi::MediaDevices => imp::global_has(&["navigator", "mediaDevices"]),
                BrowserApi::Geolocation => imp::global_has(&["navigator", "geolocation"]),
                BrowserApi::Notification => imp::global_has(&["Notification"]),
                BrowserApi::VisibilityState => imp::global_has(&["document", "visibilityState"]),
                BrowserApi::LocalStorage => web_sys::window()
                    .and_then(|window| window.local_storage().ok().flatten())
                    .is_some(),
                BrowserApi::OnlineStatus => imp::global_has(&["navigator", "onLine"]),
                BrowserApi::Fetch => imp::global_has(&["fetch"]),
                BrowserApi::FileSystemAccess => imp::global_has(&["showDirectoryPicker"]),
                BrowserApi::Battery => imp::global_has(&["navigator", "getBattery"]),
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = api;
            false
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use js_sys::{Function, Reflect};
    use wasm_bindgen::{JsCast, JsValue};

    fn lookup(target: &JsValue, name: &str) -> Option<JsValue> {
        Reflect::get(target, &JsValue::from_str(name))
            .ok()
            .filter(|value| !value.is_undefined() && !value.is_null())
    }

    /// Walks `path` from the global object; every segment must be defined.
    pub fn global_has(path: &[&str]) -> bool {
        let mut current: JsValue = js_sys::global().into();
        for segment in path {
            match lookup(&current, segment) {
                Some(next) => current = next,
                None => return false,
            }
        }
        true
    }

    /// Calls a zero-argument method on `globalThis.Capacitor`.
    pub fn call_capacitor(method: &str) -> Option<JsValue> {
        let capacitor = lookup(&js_sys::global().into(), "Capacitor")?;
        let function = lookup(&capacitor, method)?.dyn_into::<Function>().ok()?;
        function.call0(&capacitor).ok()
    }
}

#[cfg(test)]
mod tests {
    use chargepath_platform::{Platform, PlatformCapabilities, PlatformDetector};
    use std::rc::Rc;

    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn non_wasm_host_is_headless_web() {
        let detector = PlatformDetector::new(Rc::new(BrowserEnvironment));

        assert!(!detector.is_native());
        assert_eq!(detector.platform(), Platform::Web);
        assert_eq!(detector.capabilities(), PlatformCapabilities::none());
        assert!(BrowserApi::ALL
            .iter()
            .all(|api| !BrowserEnvironment.has_api(*api)));
    }
}
