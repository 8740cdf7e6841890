//! Time helpers shared across contracts and adapters.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current unix timestamp in milliseconds.
pub fn unix_time_ms_now() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now().max(0.0) as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Milliseconds from now until `target_unix_ms`, or zero when the target is in the past.
pub fn millis_until(target_unix_ms: u64) -> u64 {
    target_unix_ms.saturating_sub(unix_time_ms_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_targets_fire_immediately() {
        assert_eq!(millis_until(0), 0);
        let ahead = millis_until(unix_time_ms_now() + 60_000);
        assert!(ahead > 50_000 && ahead <= 60_000);
    }
}
