//! Security controller configuration

use crate::integrity::SecurityAdvisory;
use crate::platform::PromptOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default preference key for the app lock flag
pub const APP_LOCK_PREFERENCE_KEY: &str = "app_lock_enabled";

/// Host platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// iOS or Android
    #[default]
    Native,
    /// Browser build: no OS prompt, capture control or root check
    Web,
}

impl PlatformKind {
    /// Whether OS-level security features exist
    pub fn is_native(self) -> bool {
        matches!(self, Self::Native)
    }
}

/// Configuration for [`DeviceSecurityController`](crate::DeviceSecurityController)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Host platform
    pub platform: PlatformKind,
    /// Store key holding the app lock preference
    pub app_lock_key: String,
    /// Authentication prompt text
    pub prompt: PromptOptions,
    /// Compromised-device dialog text
    pub advisory: SecurityAdvisory,
    /// Run the root check during `init`
    pub check_integrity_on_init: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::Native,
            app_lock_key: APP_LOCK_PREFERENCE_KEY.to_string(),
            prompt: PromptOptions::default(),
            advisory: SecurityAdvisory::default(),
            check_integrity_on_init: true,
        }
    }
}

impl SecurityConfig {
    /// Web defaults
    pub fn web() -> Self {
        Self {
            platform: PlatformKind::Web,
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field constraints
    pub fn validate(&self) -> Result<()> {
        if self.app_lock_key.trim().is_empty() {
            return Err(Error::Config("app_lock_key must not be empty".to_string()));
        }
        if self.prompt.prompt_message.trim().is_empty() {
            return Err(Error::Config("prompt message must not be empty".to_string()));
        }
        Ok(())
    }
}
