use std::{cell::RefCell, collections::HashMap};

use chargepath_platform::ConnectionType;
use js_sys::Promise;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::*;

#[wasm_bindgen(inline_js = r#"
const scheduledNotifications = new Map();
const GEOLOCATION_CODES = { 1: 'PERMISSION_DENIED', 2: 'POSITION_UNAVAILABLE', 3: 'TIMEOUT' };

function bridgeError(code, message) {
  const err = new Error(message);
  err.code = code;
  return err;
}

function requireStorage() {
  let storage = null;
  try {
    storage = globalThis.localStorage ?? null;
  } catch (_) {
    storage = null;
  }
  if (!storage) {
    throw bridgeError('UNAVAILABLE', 'localStorage is unavailable in this browser context');
  }
  return storage;
}

function requireNotification() {
  if (typeof Notification === 'undefined') {
    throw bridgeError('UNAVAILABLE', 'Notification API is unavailable in this browser context');
  }
  return Notification;
}

function requireGeolocation() {
  const geo = globalThis.navigator && globalThis.navigator.geolocation;
  if (!geo) {
    throw bridgeError('UNAVAILABLE', 'navigator.geolocation is unavailable');
  }
  return geo;
}

function requireMediaDevices() {
  const media = globalThis.navigator && globalThis.navigator.mediaDevices;
  if (!media || typeof media.getUserMedia !== 'function') {
    throw bridgeError('UNAVAILABLE', 'navigator.mediaDevices is unavailable');
  }
  return media;
}

function geolocationError(err) {
  return bridgeError(GEOLOCATION_CODES[err && err.code] || 'POSITION_UNAVAILABLE', (err && err.message) || 'geolocation failed');
}

function toPosition(fix) {
  const c = fix.coords;
  return {
    latitude: c.latitude,
    longitude: c.longitude,
    accuracy: c.accuracy,
    altitude: c.altitude,
    altitudeAccuracy: c.altitudeAccuracy,
    heading: Number.isNaN(c.heading) ? null : c.heading,
    speed: c.speed,
    timestamp: Math.round(fix.timestamp),
  };
}

function cancelScheduled(id) {
  const handle = scheduledNotifications.get(id);
  if (handle !== undefined) {
    clearTimeout(handle);
    scheduledNotifications.delete(id);
  }
}

function readAsDataUrl(file) {
  return new Promise((resolve, reject) => {
    const reader = new FileReader();
    reader.onload = () => resolve(String(reader.result));
    reader.onerror = () => reject(reader.error || new Error('failed to read captured photo'));
    reader.readAsDataURL(file);
  });
}

export async function jsStorageProbe(key) {
  const storage = requireStorage();
  storage.setItem(key, key);
  storage.removeItem(key);
}
export async function jsStorageGet(key) { return requireStorage().getItem(key); }
export async function jsStorageSet(key, value) { requireStorage().setItem(key, value); }
export async function jsStorageRemove(key) { requireStorage().removeItem(key); }
export async function jsStorageClear() { requireStorage().clear(); }
export async function jsStorageKeys() {
  const storage = requireStorage();
  const keys = [];
  for (let i = 0; i < storage.length; i += 1) {
    const key = storage.key(i);
    if (key !== null) keys.push(key);
  }
  return keys;
}

export async function jsNotificationPermission() { return requireNotification().permission; }
export async function jsNotificationRequestPermission() {
  return await requireNotification().requestPermission();
}
export async function jsNotificationShow(id, title, body) {
  const N = requireNotification();
  new N(title, { body, tag: String(id) });
}
export async function jsNotificationSchedule(id, delaySegments, title, body) {
  const N = requireNotification();
  cancelScheduled(id);
  const remaining = Array.from(delaySegments);
  const arm = () => {
    const next = remaining.shift();
    if (next === undefined) {
      scheduledNotifications.delete(id);
      new N(title, { body, tag: String(id) });
      return;
    }
    scheduledNotifications.set(id, setTimeout(arm, next));
  };
  arm();
}
export async function jsNotificationCancel(id) { cancelScheduled(id); }

export async function jsGeolocationCurrent(options) {
  const geo = requireGeolocation();
  return await new Promise((resolve, reject) => {
    geo.getCurrentPosition((fix) => resolve(toPosition(fix)), (err) => reject(geolocationError(err)), options);
  });
}
export async function jsGeolocationWatch(options, onPosition, onError) {
  const geo = requireGeolocation();
  const id = geo.watchPosition(
    (fix) => onPosition(toPosition(fix)),
    (err) => onError(geolocationError(err)),
    options,
  );
  return String(id);
}
export async function jsGeolocationClearWatch(id) { requireGeolocation().clearWatch(Number(id)); }

export async function jsCameraRequestPermission() {
  const media = requireMediaDevices();
  try {
    const stream = await media.getUserMedia({ video: true });
    stream.getTracks().forEach((track) => track.stop());
    return 'granted';
  } catch (err) {
    if (err && (err.name === 'NotAllowedError' || err.name === 'SecurityError')) {
      return 'denied';
    }
    throw err;
  }
}
export async function jsCameraCapture(options) {
  const input = document.createElement('input');
  input.type = 'file';
  input.accept = 'image/*';
  if (options.source === 'CAMERA') {
    input.capture = 'environment';
  }
  const file = await new Promise((resolve) => {
    input.addEventListener('change', () => resolve(input.files && input.files[0] ? input.files[0] : null), { once: true });
    input.addEventListener('cancel', () => resolve(null), { once: true });
    input.click();
  });
  if (!file) {
    throw bridgeError('CANCELLED', 'User cancelled photo capture');
  }
  const format = (file.type && file.type.split('/')[1]) || 'jpeg';
  const photo = { format };
  if (options.resultType === 'base64' || options.resultType === 'dataUrl') {
    const dataUrl = await readAsDataUrl(file);
    if (options.resultType === 'base64') {
      photo.base64String = dataUrl.slice(dataUrl.indexOf(',') + 1);
    } else {
      photo.dataUrl = dataUrl;
    }
  } else {
    photo.webPath = URL.createObjectURL(file);
  }
  return photo;
}

export async function jsDeviceBattery() {
  const nav = globalThis.navigator;
  if (!nav || typeof nav.getBattery !== 'function') {
    return { batteryLevel: null, isCharging: null };
  }
  const battery = await nav.getBattery();
  return { batteryLevel: battery.level, isCharging: battery.charging };
}
export async function jsDeviceNetwork() {
  const nav = globalThis.navigator;
  const connected = !nav || nav.onLine !== false;
  const info = nav && nav.connection;
  const connectionType = info ? (info.type || info.effectiveType || 'unknown') : 'unknown';
  return { connected, connectionType };
}
"#)]
extern "C" {
    #[wasm_bindgen(js_name = jsStorageProbe)]
    fn js_storage_probe(key: &str) -> Promise;
    #[wasm_bindgen(js_name = jsStorageGet)]
    fn js_storage_get(key: &str) -> Promise;
    #[wasm_bindgen(js_name = jsStorageSet)]
    fn js_storage_set(key: &str, value: &str) -> Promise;
    #[wasm_bindgen(js_name = jsStorageRemove)]
    fn js_storage_remove(key: &str) -> Promise;
    #[wasm_bindgen(js_name = jsStorageClear)]
    fn js_storage_clear() -> Promise;
    #[wasm_bindgen(js_name = jsStorageKeys)]
    fn js_storage_keys() -> Promise;

    #[wasm_bindgen(js_name = jsNotificationPermission)]
    fn js_notification_permission() -> Promise;
    #[wasm_bindgen(js_name = jsNotificationRequestPermission)]
    fn js_notification_request_permission() -> Promise;
    #[wasm_bindgen(js_name = jsNotificationShow)]
    fn js_notification_show(id: i32, title: &str, body: &str) -> Promise;
    #[wasm_bindgen(js_name = jsNotificationSchedule)]
    fn js_notification_schedule(
        id: i32,
        delay_segments_ms: &[u32],
        title: &str,
        body: &str,
    ) -> Promise;
    #[wasm_bindgen(js_name = jsNotificationCancel)]
    fn js_notification_cancel(id: i32) -> Promise;

    #[wasm_bindgen(js_name = jsGeolocationCurrent)]
    fn js_geolocation_current(options: JsValue) -> Promise;
    #[wasm_bindgen(js_name = jsGeolocationWatch)]
    fn js_geolocation_watch(
        options: JsValue,
        on_position: &Closure<dyn FnMut(JsValue)>,
        on_error: &Closure<dyn FnMut(JsValue)>,
    ) -> Promise;
    #[wasm_bindgen(js_name = jsGeolocationClearWatch)]
    fn js_geolocation_clear_watch(id: &str) -> Promise;

    #[wasm_bindgen(js_name = jsCameraRequestPermission)]
    fn js_camera_request_permission() -> Promise;
    #[wasm_bindgen(js_name = jsCameraCapture)]
    fn js_camera_capture(options: JsValue) -> Promise;

    #[wasm_bindgen(js_name = jsDeviceBattery)]
    fn js_device_battery() -> Promise;
    #[wasm_bindgen(js_name = jsDeviceNetwork)]
    fn js_device_network() -> Promise;
}

type WatchClosures = (Closure<dyn FnMut(JsValue)>, Closure<dyn FnMut(JsValue)>);

thread_local! {
    static WATCH_CLOSURES: RefCell<HashMap<String, WatchClosures>> = RefCell::new(HashMap::new());
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNetworkStatus {
    connected: bool,
    connection_type: String,
}

async fn await_promise(promise: Promise) -> Result<JsValue, BridgeError> {
    JsFuture::from(promise).await.map_err(js_error_to_bridge)
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
    let message = js_string_field(&err, "message").unwrap_or_else(|| format!("{err:?}"));
    match js_string_field(&err, "code")
        .or_else(|| js_string_field(&err, "name"))
        .filter(|code| code != "Error")
    {
        Some(code) => BridgeError::with_code(code, message),
        None => BridgeError::new(message),
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, BridgeError> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| BridgeError::new(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: JsValue) -> Result<T, BridgeError> {
    from_value(value).map_err(|e| BridgeError::new(e.to_string()))
}

async fn promise_to_json<T: DeserializeOwned>(promise: Promise) -> Result<T, BridgeError> {
    decode(await_promise(promise).await?)
}

async fn promise_to_unit(promise: Promise) -> Result<(), BridgeError> {
    let _ = await_promise(promise).await?;
    Ok(())
}

async fn promise_to_string(promise: Promise) -> Result<String, BridgeError> {
    await_promise(promise)
        .await?
        .as_string()
        .ok_or_else(|| BridgeError::new("browser API returned a non-string payload"))
}

pub async fn storage_probe(key: &str) -> Result<(), BridgeError> {
    promise_to_unit(js_storage_probe(key)).await
}

pub async fn storage_get(key: &str) -> Result<Option<String>, BridgeError> {
    let value = await_promise(js_storage_get(key)).await?;
    if value.is_null() || value.is_undefined() {
        Ok(None)
    } else {
        value
            .as_string()
            .map(Some)
            .ok_or_else(|| BridgeError::new("localStorage returned a non-string payload"))
    }
}

pub async fn storage_set(key: &str, value: &str) -> Result<(), BridgeError> {
    promise_to_unit(js_storage_set(key, value)).await
}

pub async fn storage_remove(key: &str) -> Result<(), BridgeError> {
    promise_to_unit(js_storage_remove(key)).await
}

pub async fn storage_clear() -> Result<(), BridgeError> {
    promise_to_unit(js_storage_clear()).await
}

pub async fn storage_keys() -> Result<Vec<String>, BridgeError> {
    promise_to_json(js_storage_keys()).await
}

pub async fn notification_permission() -> Result<String, BridgeError> {
    promise_to_string(js_notification_permission()).await
}

pub async fn notification_request_permission() -> Result<String, BridgeError> {
    promise_to_string(js_notification_request_permission()).await
}

pub async fn notification_show(id: i32, title: &str, body: &str) -> Result<(), BridgeError> {
    promise_to_unit(js_notification_show(id, title, body)).await
}

pub async fn notification_schedule(
    id: i32,
    delay_segments_ms: &[u32],
    title: &str,
    body: &str,
) -> Result<(), BridgeError> {
    promise_to_unit(js_notification_schedule(id, delay_segments_ms, title, body)).await
}

pub async fn notification_cancel(id: i32) -> Result<(), BridgeError> {
    promise_to_unit(js_notification_cancel(id)).await
}

pub async fn geolocation_current(options: &PositionOptions) -> Result<Position, BridgeError> {
    promise_to_json(js_geolocation_current(to_js(options)?)).await
}

pub async fn geolocation_watch(
    options: &PositionOptions,
    listener: PositionListener,
) -> Result<String, BridgeError> {
    let on_position = {
        let listener = listener.clone();
        Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| listener(decode(value)))
    };
    let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
        listener(Err(js_error_to_bridge(err)))
    });
    let id = promise_to_string(js_geolocation_watch(
        to_js(options)?,
        &on_position,
        &on_error,
    ))
    .await?;
    WATCH_CLOSURES.with(|watches| {
        watches
            .borrow_mut()
            .insert(id.clone(), (on_position, on_error));
    });
    Ok(id)
}

pub async fn geolocation_clear_watch(id: &str) -> Result<(), BridgeError> {
    promise_to_unit(js_geolocation_clear_watch(id)).await?;
    WATCH_CLOSURES.with(|watches| {
        watches.borrow_mut().remove(id);
    });
    Ok(())
}

pub async fn camera_request_permission() -> Result<String, BridgeError> {
    promise_to_string(js_camera_request_permission()).await
}

pub async fn camera_capture(options: &PhotoOptions) -> Result<Photo, BridgeError> {
    promise_to_json(js_camera_capture(to_js(options)?)).await
}

pub async fn device_battery() -> Result<BatteryInfo, BridgeError> {
    promise_to_json(js_device_battery()).await
}

pub async fn device_network() -> Result<NetworkStatus, BridgeError> {
    let raw: RawNetworkStatus = promise_to_json(js_device_network()).await?;
    Ok(NetworkStatus {
        connected: raw.connected,
        connection_type: if raw.connected {
            ConnectionType::from_token(&raw.connection_type)
        } else {
            ConnectionType::None
        },
    })
}
