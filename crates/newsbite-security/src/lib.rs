//! Device security layer for Newsbite
//!
//! Gates app content behind device authentication:
//! - **App lock**: locks when the app is backgrounded, unlocks through the OS
//!   biometric/passcode prompt, persists the preference in the encrypted store
//! - **Root advisory**: flags rooted/jailbroken devices once per process,
//!   informational only
//! - **Screen privacy**: suppresses screenshots and app-switcher previews while
//!   locked or while a sensitive screen is shown
//!
//! Platform services are injected as traits ([`AuthenticationProvider`],
//! [`IntegrityChecker`], [`ScreenCaptureControl`], [`AdvisoryPresenter`]);
//! hosts without them fail open. Doubles live in [`mock`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;
pub mod integrity;
pub mod lifecycle;
pub mod mock;
pub mod platform;
pub mod screen_privacy;

pub use config::{PlatformKind, SecurityConfig, APP_LOCK_PREFERENCE_KEY};
pub use controller::{ContentGate, DeviceSecurityController, SecurityPlatform, SecuritySnapshot};
pub use error::{Error, Result};
pub use integrity::{IntegrityMonitor, SecurityAdvisory};
pub use lifecycle::{AppLifecycleState, LifecycleTransition};
pub use platform::{
    AdvisoryPresenter, AuthenticationOutcome, AuthenticationProvider, IntegrityChecker,
    PromptOptions, ScreenCaptureControl,
};
pub use screen_privacy::{PrivacyClaim, ScreenPrivacy, ScreenPrivacyGuard};
