//! Transport to the native runtime's plugin bridge.
//!
//! Native adapters never touch JavaScript directly: every call is a plugin method invocation with
//! a JSON options object and a JSON result, which keeps them testable with
//! [`RecordingNativeBridge`].

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    future::Future,
    pin::Pin,
    rc::Rc,
};

use chargepath_platform::BridgeError;
use serde_json::Value;

/// Boxed future returned by [`NativeBridge`] calls.
pub type BridgeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Receives every event delivered to a bridge listener.
pub type BridgeListener = Rc<dyn Fn(Result<Value, BridgeError>)>;

/// Plugin-call transport into the native runtime.
pub trait NativeBridge {
    /// Returns whether the runtime bridge is present at all.
    fn is_available(&self) -> bool;

    /// Returns whether `plugin` is registered with the runtime.
    fn is_plugin_available(&self, plugin: &str) -> bool;

    /// Invokes `plugin.method(options)` and resolves with its JSON result.
    fn invoke<'a>(
        &'a self,
        plugin: &'a str,
        method: &'a str,
        options: Value,
    ) -> BridgeFuture<'a, Result<Value, BridgeError>>;

    /// Invokes a callback-style method and routes every callback to `listener`.
    ///
    /// `addListener` methods take the event name from `options.eventName`. Resolves with an id
    /// accepted by [`NativeBridge::release`].
    fn listen<'a>(
        &'a self,
        plugin: &'a str,
        method: &'a str,
        options: Value,
        listener: BridgeListener,
    ) -> BridgeFuture<'a, Result<String, BridgeError>>;

    /// Drops the listener registered under `id`. Unknown ids are ignored.
    fn release(&self, id: &str);
}

#[cfg(target_arch = "wasm32")]
type ListenerClosure =
    wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue, wasm_bindgen::JsValue)>;

/// Bridge backed by `window.Capacitor.Plugins`.
///
/// Off `wasm32` the runtime is never present and every call is rejected with `UNAVAILABLE`.
#[derive(Debug, Default)]
pub struct CapacitorBridge {
    #[cfg(target_arch = "wasm32")]
    listeners: RefCell<HashMap<String, ListenerClosure>>,
}

impl CapacitorBridge {
    /// Creates a bridge over the page's Capacitor runtime.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn runtime_missing() -> BridgeError {
    BridgeError::with_code(
        "UNAVAILABLE",
        "The native runtime bridge is only reachable when compiled for wasm32",
    )
}

impl NativeBridge for CapacitorBridge {
    fn is_available(&self) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            capacitor::js_cap_available()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            false
        }
    }

    fn is_plugin_available(&self, plugin: &str) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            capacitor::js_cap_plugin_available(plugin)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = plugin;
            false
        }
    }

    fn invoke<'a>(
        &'a self,
        plugin: &'a str,
        method: &'a str,
        options: Value,
    ) -> BridgeFuture<'a, Result<Value, BridgeError>> {
        Box::pin(async move {
            #[cfg(target_arch = "wasm32")]
            {
                capacitor::invoke(plugin, method, &options).await
            }

            #[cfg(not(target_arch = "wasm32"))]
            {
                let _ = (plugin, method, options);
                Err(runtime_missing())
            }
        })
    }

    fn listen<'a>(
        &'a self,
        plugin: &'a str,
        method: &'a str,
        options: Value,
        listener: BridgeListener,
    ) -> BridgeFuture<'a, Result<String, BridgeError>> {
        Box::pin(async move {
            #[cfg(target_arch = "wasm32")]
            {
                let (id, closure) = capacitor::listen(plugin, method, &options, listener).await?;
                self.listeners.borrow_mut().insert(id.clone(), closure);
                Ok(id)
            }

            #[cfg(not(target_arch = "wasm32"))]
            {
                let _ = (plugin, method, options, listener);
                Err(runtime_missing())
            }
        })
    }

    fn release(&self, id: &str) {
        #[cfg(target_arch = "wasm32")]
        {
            capacitor::js_cap_release(id);
            self.listeners.borrow_mut().remove(id);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = id;
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod capacitor {
    use js_sys::Promise;
    use serde::Serialize;
    use serde_json::Value;
    use serde_wasm_bindgen::{from_value, Serializer};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;

    use super::{BridgeError, BridgeListener};

    #[wasm_bindgen(inline_js = r#"
const listenerHandles = new Map();
let nextListenerId = 1;

function bridgeError(code, message) {
  const err = new Error(message);
  err.code = code;
  return err;
}

function runtime() {
  const cap = globalThis.Capacitor;
  return cap && cap.Plugins ? cap : null;
}

function resolveMethod(plugin, method) {
  const cap = runtime();
  if (!cap) {
    throw bridgeError('UNAVAILABLE', 'Capacitor runtime is not present');
  }
  const target = cap.Plugins[plugin];
  if (!target) {
    throw bridgeError('UNAVAILABLE', `${plugin} plugin is not registered`);
  }
  const fn = target[method];
  if (typeof fn !== 'function') {
    throw bridgeError('UNIMPLEMENTED', `${plugin}.${method} is not implemented`);
  }
  return [target, fn];
}

export function jsCapAvailable() {
  const cap = runtime();
  if (!cap) return false;
  return typeof cap.isNativePlatform === 'function' ? cap.isNativePlatform() : true;
}

export function jsCapPluginAvailable(plugin) {
  const cap = runtime();
  if (!cap) return false;
  if (typeof cap.isPluginAvailable === 'function') return cap.isPluginAvailable(plugin);
  return !!cap.Plugins[plugin];
}

export async function jsCapInvoke(plugin, method, options) {
  const [target, fn] = resolveMethod(plugin, method);
  const result = await fn.call(target, options);
  return result === undefined ? null : result;
}

export async function jsCapListen(plugin, method, options, callback) {
  const [target, fn] = resolveMethod(plugin, method);
  const id = `listener-${nextListenerId++}`;
  if (method === 'addListener') {
    const handle = await fn.call(target, options.eventName, (data) => callback(data ?? null, null));
    listenerHandles.set(id, () => handle && typeof handle.remove === 'function' && handle.remove());
    return id;
  }
  const callbackId = await fn.call(target, options, (data, err) => callback(data ?? null, err ?? null));
  const key = callbackId === undefined || callbackId === null ? id : String(callbackId);
  listenerHandles.set(key, () => {});
  return key;
}

export function jsCapRelease(id) {
  const release = listenerHandles.get(id);
  listenerHandles.delete(id);
  if (release) release();
}
"#)]
    extern "C" {
        #[wasm_bindgen(js_name = jsCapAvailable)]
        pub fn js_cap_available() -> bool;
        #[wasm_bindgen(js_name = jsCapPluginAvailable)]
        pub fn js_cap_plugin_available(plugin: &str) -> bool;
        #[wasm_bindgen(js_name = jsCapInvoke)]
        fn js_cap_invoke(plugin: &str, method: &str, options: JsValue) -> Promise;
        #[wasm_bindgen(js_name = jsCapListen)]
        fn js_cap_listen(
            plugin: &str,
            method: &str,
            options: JsValue,
            callback: &Closure<dyn FnMut(JsValue, JsValue)>,
        ) -> Promise;
        #[wasm_bindgen(js_name = jsCapRelease)]
        pub fn js_cap_release(id: &str);
    }

    fn js_string_field(value: &JsValue, name: &str) -> Option<String> {
        js_sys::Reflect::get(value, &JsValue::from_str(name))
            .ok()
            .and_then(|field| field.as_string())
    }

    fn js_error_to_bridge(err: JsValue) -> BridgeError {
        if let Some(text) = err.as_string() {
            return BridgeError::new(text);
        }
        let message = js_string_field(&err, "message")
            .or_else(|| js_string_field(&err, "errorMessage"))
            .unwrap_or_else(|| format!("{err:?}"));
        match js_string_field(&err, "code") {
            Some(code) => BridgeError::with_code(code, message),
            None => BridgeError::new(message),
        }
    }

    fn to_js(options: &Value) -> Result<JsValue, BridgeError> {
        options
            .serialize(&Serializer::json_compatible())
            .map_err(|e| BridgeError::new(e.to_string()))
    }

    fn to_json(value: JsValue) -> Result<Value, BridgeError> {
        if value.is_null() || value.is_undefined() {
            return Ok(Value::Null);
        }
        from_value(value).map_err(|e| BridgeError::new(e.to_string()))
    }

    pub async fn invoke(plugin: &str, method: &str, options: &Value) -> Result<Value, BridgeError> {
        let value = JsFuture::from(js_cap_invoke(plugin, method, to_js(options)?))
            .await
            .map_err(js_error_to_bridge)?;
        to_json(value)
    }

    pub async fn listen(
        plugin: &str,
        method: &str,
        options: &Value,
        listener: BridgeListener,
    ) -> Result<(String, Closure<dyn FnMut(JsValue, JsValue)>), BridgeError> {
        let closure = Closure::<dyn FnMut(JsValue, JsValue)>::new(
            move |data: JsValue, err: JsValue| {
                if err.is_null() || err.is_undefined() {
                    listener(to_json(data));
                } else {
                    listener(Err(js_error_to_bridge(err)));
                }
            },
        );
        let id = JsFuture::from(js_cap_listen(plugin, method, to_js(options)?, &closure))
            .await
            .map_err(js_error_to_bridge)?
            .as_string()
            .ok_or_else(|| BridgeError::new("listener registration returned no id"))?;
        Ok((id, closure))
    }
}

/// A recorded [`NativeBridge::invoke`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeCall {
    /// Plugin name, such as `Preferences`.
    pub plugin: String,
    /// Plugin method name.
    pub method: String,
    /// Options object passed to the method.
    pub options: Value,
}

/// In-process bridge with scripted responses, used by tests and previews.
///
/// Responses are queued per `(plugin, method)`; an empty queue answers `null`. Listener events
/// are delivered with [`RecordingNativeBridge::emit`].
#[derive(Default)]
pub struct RecordingNativeBridge {
    plugins: BTreeSet<String>,
    responses: RefCell<HashMap<(String, String), VecDeque<Result<Value, BridgeError>>>>,
    calls: RefCell<Vec<BridgeCall>>,
    listeners: RefCell<BTreeMap<String, BridgeListener>>,
    next_listener: Cell<u32>,
}

impl RecordingNativeBridge {
    /// Creates a bridge with the given plugins registered.
    pub fn with_plugins(plugins: &[&str]) -> Self {
        Self {
            plugins: plugins.iter().map(|name| (*name).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Queues the next result of `plugin.method`.
    pub fn respond(&self, plugin: &str, method: &str, result: Result<Value, BridgeError>) {
        self.responses
            .borrow_mut()
            .entry((plugin.to_string(), method.to_string()))
            .or_default()
            .push_back(result);
    }

    /// Returns every `invoke` and `listen` call in order.
    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.borrow().clone()
    }

    /// Returns the calls made to `plugin.method`.
    pub fn calls_to(&self, plugin: &str, method: &str) -> Vec<BridgeCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.plugin == plugin && call.method == method)
            .cloned()
            .collect()
    }

    /// Ids of the listeners that have not been released.
    pub fn active_listeners(&self) -> Vec<String> {
        self.listeners.borrow().keys().cloned().collect()
    }

    /// Delivers `event` to the listener registered under `id`. Returns whether it existed.
    pub fn emit(&self, id: &str, event: Result<Value, BridgeError>) -> bool {
        let listener = self.listeners.borrow().get(id).cloned();
        match listener {
            Some(listener) => {
                listener(event);
                true
            }
            None => false,
        }
    }

    fn record(&self, plugin: &str, method: &str, options: Value) {
        self.calls.borrow_mut().push(BridgeCall {
            plugin: plugin.to_string(),
            method: method.to_string(),
            options,
        });
    }
}

impl std::fmt::Debug for RecordingNativeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingNativeBridge")
            .field("plugins", &self.plugins)
            .field("calls", &self.calls.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl NativeBridge for RecordingNativeBridge {
    fn is_available(&self) -> bool {
        true
    }

    fn is_plugin_available(&self, plugin: &str) -> bool {
        self.plugins.contains(plugin)
    }

    fn invoke<'a>(
        &'a self,
        plugin: &'a str,
        method: &'a str,
        options: Value,
    ) -> BridgeFuture<'a, Result<Value, BridgeError>> {
        Box::pin(async move {
            self.record(plugin, method, options);
            if !self.is_plugin_available(plugin) {
                return Err(BridgeError::with_code(
                    "UNAVAILABLE",
                    format!("{plugin} plugin is not registered"),
                ));
            }
            self.responses
                .borrow_mut()
                .get_mut(&(plugin.to_string(), method.to_string()))
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(Value::Null))
        })
    }

    fn listen<'a>(
        &'a self,
        plugin: &'a str,
        method: &'a str,
        options: Value,
        listener: BridgeListener,
    ) -> BridgeFuture<'a, Result<String, BridgeError>> {
        Box::pin(async move {
            self.record(plugin, method, options);
            if !self.is_plugin_available(plugin) {
                return Err(BridgeError::with_code(
                    "UNAVAILABLE",
                    format!("{plugin} plugin is not registered"),
                ));
            }
            let next = self.next_listener.get() + 1;
            self.next_listener.set(next);
            let id = format!("listener-{next}");
            self.listeners.borrow_mut().insert(id.clone(), listener);
            Ok(id)
        })
    }

    fn release(&self, id: &str) {
        self.listeners.borrow_mut().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn capacitor_bridge_is_absent_off_wasm() {
        let bridge = CapacitorBridge::new();

        assert!(!bridge.is_available());
        assert!(!bridge.is_plugin_available("Preferences"));
        let err = block_on(bridge.invoke("Preferences", "get", json!({"key": "a"})))
            .expect_err("no runtime");
        assert!(err.is_unimplemented());
    }

    #[test]
    fn recording_bridge_replays_queued_responses_in_order() {
        let bridge = RecordingNativeBridge::with_plugins(&["Device"]);
        bridge.respond("Device", "getId", Ok(json!({"identifier": "a"})));
        bridge.respond("Device", "getId", Ok(json!({"identifier": "b"})));

        let first = block_on(bridge.invoke("Device", "getId", json!({}))).expect("first");
        let second = block_on(bridge.invoke("Device", "getId", json!({}))).expect("second");
        let drained = block_on(bridge.invoke("Device", "getId", json!({}))).expect("drained");

        assert_eq!(first, json!({"identifier": "a"}));
        assert_eq!(second, json!({"identifier": "b"}));
        assert_eq!(drained, Value::Null);
        assert_eq!(bridge.calls_to("Device", "getId").len(), 3);
    }

    #[test]
    fn listeners_receive_events_until_released() {
        let bridge = RecordingNativeBridge::with_plugins(&["Geolocation"]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = block_on(bridge.listen(
            "Geolocation",
            "watchPosition",
            json!({}),
            Rc::new(move |event: Result<Value, BridgeError>| {
                sink.borrow_mut().push(event);
            }),
        ))
        .expect("listen");

        assert!(bridge.emit(&id, Ok(json!({"n": 1}))));
        bridge.release(&id);
        assert!(!bridge.emit(&id, Ok(json!({"n": 2}))));
        assert_eq!(*seen.borrow(), vec![Ok(json!({"n": 1}))]);
        assert!(bridge.active_listeners().is_empty());
    }

    #[test]
    fn unregistered_plugins_are_rejected() {
        let bridge = RecordingNativeBridge::with_plugins(&[]);
        let err = block_on(bridge.invoke("Camera", "getPhoto", json!({}))).expect_err("missing");
        assert_eq!(err.code.as_deref(), Some("UNAVAILABLE"));
    }
}
