//! Platform capability seams
//!
//! The host application implements these for each OS:
//! - iOS: LocalAuthentication, jailbreak probes, secure window layer
//! - Android: BiometricPrompt, root detection, FLAG_SECURE
//!
//! Authentication and integrity calls may suspend for an unbounded time (an
//! OS prompt waits on the user). Screen capture and advisory calls are
//! fire-and-forget.

use crate::integrity::SecurityAdvisory;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text and behaviour of the OS authentication prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOptions {
    /// Prompt title/message
    pub prompt_message: String,
    /// Label of the passcode fallback button
    pub fallback_label: String,
    /// Label of the cancel button
    pub cancel_label: String,
    /// Allow the device passcode when biometrics fail
    pub allow_device_fallback: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            prompt_message: "Unlock Newsbite".to_string(),
            fallback_label: "Use Passcode".to_string(),
            cancel_label: "Cancel".to_string(),
            allow_device_fallback: true,
        }
    }
}

/// Result of a completed prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationOutcome {
    /// User authenticated
    Success,
    /// Biometric/passcode did not match
    Failed,
    /// User or system dismissed the prompt
    Cancelled,
}

impl AuthenticationOutcome {
    /// Whether the outcome grants access
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Device authentication (biometrics with passcode fallback)
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Whether authentication hardware is present
    async fn has_hardware(&self) -> Result<bool>;

    /// Whether the user has enrolled a biometric or passcode
    async fn is_enrolled(&self) -> Result<bool>;

    /// Show the prompt and wait for the user
    async fn authenticate(&self, options: &PromptOptions) -> Result<AuthenticationOutcome>;
}

/// Root/jailbreak detection
#[async_trait]
pub trait IntegrityChecker: Send + Sync {
    /// Whether the device appears rooted or jailbroken
    async fn is_compromised(&self) -> Result<bool>;
}

/// OS screen-capture suppression
pub trait ScreenCaptureControl: Send + Sync {
    /// Block screenshots, recording and app-switcher previews
    fn prevent(&self) -> Result<()>;

    /// Lift the block
    fn allow(&self) -> Result<()>;
}

/// Non-blocking informational dialog
pub trait AdvisoryPresenter: Send + Sync {
    /// Show `advisory`. Must not wait for acknowledgement.
    fn present(&self, advisory: &SecurityAdvisory);
}
