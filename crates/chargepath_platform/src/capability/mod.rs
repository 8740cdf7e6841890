//! Capability contracts implemented by the web and native adapter sets.

pub mod camera;
pub mod device;
pub mod geolocation;
pub mod http;
pub mod notifications;
pub mod storage;

use serde::{Deserialize, Serialize};

/// Permission posture reported by permission-gated capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionState {
    /// Access granted.
    Granted,
    /// Access refused.
    Denied,
    /// The user has not been asked yet.
    Prompt,
    /// The platform asks with a rationale before prompting (Android).
    PromptWithRationale,
}

impl PermissionState {
    /// Parses the permission tokens used by browser and native permission APIs.
    ///
    /// The browser's `default` maps to [`PermissionState::Prompt`]. Unknown tokens map to
    /// `Prompt` as well, since asking again is the only safe follow-up.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "granted" | "limited" => Self::Granted,
            "denied" => Self::Denied,
            "prompt-with-rationale" => Self::PromptWithRationale,
            _ => Self::Prompt,
        }
    }

    /// Returns whether access is currently granted.
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_tokens_map_to_states() {
        assert_eq!(PermissionState::from_token("granted"), PermissionState::Granted);
        assert_eq!(PermissionState::from_token("limited"), PermissionState::Granted);
        assert_eq!(PermissionState::from_token("denied"), PermissionState::Denied);
        assert_eq!(PermissionState::from_token("default"), PermissionState::Prompt);
        assert_eq!(
            PermissionState::from_token("prompt-with-rationale"),
            PermissionState::PromptWithRationale
        );
    }
}
