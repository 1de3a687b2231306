//! Device security controller
//!
//! Owns the app lock state machine:
//!
//! ```text
//!            background (lock enabled, native)
//!   UNLOCKED ---------------------------------> LOCKED
//!      ^                                          |
//!      |   authenticate: success / fail-open      |
//!      +------------------------------------------+
//! ```
//!
//! `is_app_lock_enabled` is an orthogonal preference persisted in the
//! encrypted store. At most one authentication prompt is in flight at a time;
//! further requests while one is pending return `false` immediately.

use crate::config::SecurityConfig;
use crate::integrity::IntegrityMonitor;
use crate::lifecycle::{AppLifecycleState, LifecycleTransition};
use crate::platform::{
    AdvisoryPresenter, AuthenticationProvider, IntegrityChecker, ScreenCaptureControl,
};
use crate::screen_privacy::{ScreenPrivacy, ScreenPrivacyGuard};
use crate::{Error, Result};
use newsbite_storage::EncryptedStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Observable security state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SecuritySnapshot {
    /// Content is hidden behind the lock screen
    pub is_locked: bool,
    /// User preference: lock on background
    pub is_app_lock_enabled: bool,
    /// Device flagged as rooted/jailbroken (advisory only)
    pub is_rooted: bool,
}

/// What the presentation layer should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentGate {
    /// Render app content
    Protected,
    /// Render the lock screen with its unlock affordance
    LockScreen,
}

impl SecuritySnapshot {
    /// Which surface to show for this state
    pub fn gate(&self) -> ContentGate {
        if self.is_locked {
            ContentGate::LockScreen
        } else {
            ContentGate::Protected
        }
    }
}

/// Platform services injected into the controller.
///
/// Missing services degrade: no authenticator fails open, no integrity
/// checker reports an intact device, no capture control skips privacy.
#[derive(Default, Clone)]
pub struct SecurityPlatform {
    /// Biometric/passcode prompt
    pub authenticator: Option<Arc<dyn AuthenticationProvider>>,
    /// Root/jailbreak detection
    pub integrity: Option<Arc<dyn IntegrityChecker>>,
    /// Screen capture suppression
    pub screen_capture: Option<Arc<dyn ScreenCaptureControl>>,
    /// Advisory dialog
    pub advisory: Option<Arc<dyn AdvisoryPresenter>>,
}

impl SecurityPlatform {
    /// Platform without any OS services
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authentication provider
    pub fn with_authenticator(mut self, authenticator: Arc<dyn AuthenticationProvider>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Set the integrity checker
    pub fn with_integrity_checker(mut self, checker: Arc<dyn IntegrityChecker>) -> Self {
        self.integrity = Some(checker);
        self
    }

    /// Set the screen capture control
    pub fn with_screen_capture(mut self, control: Arc<dyn ScreenCaptureControl>) -> Self {
        self.screen_capture = Some(control);
        self
    }

    /// Set the advisory presenter
    pub fn with_advisory_presenter(mut self, presenter: Arc<dyn AdvisoryPresenter>) -> Self {
        self.advisory = Some(presenter);
        self
    }
}

/// Marks an authentication attempt in flight; cleared on drop
struct AuthAttempt<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AuthAttempt<'a> {
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for AuthAttempt<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// App lock, root advisory and screen privacy for one application instance
pub struct DeviceSecurityController {
    config: SecurityConfig,
    store: Arc<EncryptedStore>,
    authenticator: Option<Arc<dyn AuthenticationProvider>>,
    integrity: IntegrityMonitor,
    privacy: Arc<ScreenPrivacy>,
    state: watch::Sender<SecuritySnapshot>,
    authenticating: AtomicBool,
    lifecycle: Mutex<AppLifecycleState>,
}

impl DeviceSecurityController {
    /// Create controller in the `UNLOCKED`, disabled state.
    ///
    /// On [`PlatformKind::Web`](crate::PlatformKind::Web) the platform
    /// services are ignored.
    pub fn new(
        store: Arc<EncryptedStore>,
        platform: SecurityPlatform,
        config: SecurityConfig,
    ) -> Result<Self> {
        config.validate()?;

        let platform = if config.platform.is_native() {
            platform
        } else {
            tracing::debug!("Web platform: OS security services disabled");
            SecurityPlatform::new()
        };

        let (state, _) = watch::channel(SecuritySnapshot::default());
        Ok(Self {
            integrity: IntegrityMonitor::new(
                platform.integrity,
                platform.advisory,
                config.advisory.clone(),
            ),
            privacy: Arc::new(ScreenPrivacy::new(platform.screen_capture)),
            authenticator: platform.authenticator,
            config,
            store,
            state,
            authenticating: AtomicBool::new(false),
            lifecycle: Mutex::new(AppLifecycleState::Active),
        })
    }

    /// Load the persisted preference and, if enabled, lock and prompt.
    ///
    /// The lock is engaged before the prompt is awaited, so content is never
    /// shown while the first authentication is pending. The root check runs
    /// alongside.
    pub async fn init(&self) -> SecuritySnapshot {
        let enabled = self
            .store
            .get_item::<bool>(&self.config.app_lock_key)
            .await
            .unwrap_or(false);

        self.state.send_if_modified(|s| {
            let changed = s.is_app_lock_enabled != enabled || (enabled && !s.is_locked);
            s.is_app_lock_enabled = enabled;
            if enabled {
                s.is_locked = true;
            }
            changed
        });
        tracing::info!("Security initialised (app lock enabled: {})", enabled);

        let integrity = async {
            if self.config.check_integrity_on_init {
                self.check_device_integrity().await;
            }
        };
        let unlock = async {
            if enabled {
                self.authenticate(true).await;
            }
        };
        tokio::join!(integrity, unlock);

        self.snapshot()
    }

    /// Current state
    pub fn snapshot(&self) -> SecuritySnapshot {
        *self.state.borrow()
    }

    /// Whether content is locked
    pub fn is_locked(&self) -> bool {
        self.state.borrow().is_locked
    }

    /// Whether the app lock preference is on
    pub fn is_app_lock_enabled(&self) -> bool {
        self.state.borrow().is_app_lock_enabled
    }

    /// Whether the device was flagged as rooted/jailbroken
    pub fn is_rooted(&self) -> bool {
        self.state.borrow().is_rooted
    }

    /// Whether an authentication prompt is in flight
    #[doc(hidden)]
    pub fn is_authenticating(&self) -> bool {
        self.authenticating.load(Ordering::Acquire)
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SecuritySnapshot> {
        self.state.subscribe()
    }

    /// Encrypted store the preference lives in
    pub fn store(&self) -> &Arc<EncryptedStore> {
        &self.store
    }

    /// Configuration in use
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Try to unlock.
    ///
    /// Returns `true` when access is granted (authenticated, app lock
    /// disabled and not `force`, or no usable authentication on the device)
    /// and `false` when the prompt fails, is cancelled, errors, or another
    /// attempt is already in flight. Never returns an error.
    pub async fn authenticate(&self, force: bool) -> bool {
        let Some(_attempt) = AuthAttempt::begin(&self.authenticating) else {
            tracing::debug!("Authentication already in progress; ignoring request");
            return false;
        };

        if !self.is_app_lock_enabled() && !force {
            self.grant_access();
            return true;
        }

        let Some(provider) = &self.authenticator else {
            tracing::debug!("No authentication provider; unlocking");
            self.grant_access();
            return true;
        };

        match self.prompt(provider.as_ref()).await {
            Ok(true) => {
                self.grant_access();
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::error!("Authentication error: {}", e);
                false
            }
        }
    }

    /// Unlock from the lock screen
    pub async fn unlock(&self) -> bool {
        self.authenticate(false).await
    }

    /// Turn the app lock on or off.
    ///
    /// Enabling persists first; if the write fails nothing changes and the
    /// error is returned. On success the app locks and prompts at once.
    /// Disabling unlocks immediately, then persists; a failed write is
    /// returned but the in-memory state stays unlocked.
    pub async fn toggle_app_lock(&self, enable: bool) -> Result<()> {
        if enable {
            self.store.set_item(&self.config.app_lock_key, &true).await?;
            self.state.send_if_modified(|s| {
                let changed = !s.is_app_lock_enabled || !s.is_locked;
                s.is_app_lock_enabled = true;
                s.is_locked = true;
                changed
            });
            tracing::info!("App lock enabled");
            self.authenticate(true).await;
            Ok(())
        } else {
            self.state.send_if_modified(|s| {
                let changed = s.is_app_lock_enabled || s.is_locked;
                s.is_app_lock_enabled = false;
                s.is_locked = false;
                changed
            });
            self.privacy.set_lock_claim(false);
            tracing::info!("App lock disabled");
            self.store
                .set_item(&self.config.app_lock_key, &false)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to persist app lock preference: {}", e);
                    Error::from(e)
                })
        }
    }

    /// Manually suppress or allow screen capture. Failures are logged.
    pub fn set_screen_privacy(&self, enable: bool) {
        self.privacy.set_manual_claim(enable);
    }

    /// Suppress screen capture while the returned guard lives
    pub fn protect_screen(&self) -> ScreenPrivacyGuard {
        self.privacy.protect()
    }

    /// Screen privacy state
    pub fn screen_privacy(&self) -> &ScreenPrivacy {
        &self.privacy
    }

    /// React to the host app moving between foreground and background
    pub async fn handle_lifecycle_change(&self, next: AppLifecycleState) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), next);
        let transition = LifecycleTransition::classify(previous, next);
        tracing::debug!("Lifecycle {} -> {} ({:?})", previous, next, transition);

        if !self.is_app_lock_enabled() {
            return;
        }

        match transition {
            LifecycleTransition::EnteredBackground => {
                if !self.config.platform.is_native() {
                    return;
                }
                self.set_locked(true);
                self.privacy.set_lock_claim(true);
                tracing::info!("App backgrounded; locked");
            }
            LifecycleTransition::EnteredForeground => {
                if self.is_locked() && !self.is_authenticating() {
                    self.authenticate(true).await;
                }
            }
            LifecycleTransition::Unchanged => {}
        }
    }

    /// Run the root/jailbreak check (once per controller) and flag the
    /// device if compromised. Returns the result.
    pub async fn check_device_integrity(&self) -> bool {
        let rooted = self.integrity.check_once().await;
        if rooted {
            self.state.send_if_modified(|s| {
                let changed = !s.is_rooted;
                s.is_rooted = true;
                changed
            });
        }
        rooted
    }

    async fn prompt(&self, provider: &dyn AuthenticationProvider) -> Result<bool> {
        let has_hardware = provider.has_hardware().await?;
        let is_enrolled = provider.is_enrolled().await?;
        if !has_hardware || !is_enrolled {
            tracing::warn!(
                "Device authentication unavailable (hardware: {}, enrolled: {}); unlocking",
                has_hardware,
                is_enrolled
            );
            return Ok(true);
        }

        let outcome = provider.authenticate(&self.config.prompt).await?;
        tracing::info!("Authentication prompt finished: {:?}", outcome);
        Ok(outcome.is_success())
    }

    fn grant_access(&self) {
        self.set_locked(false);
        self.privacy.set_lock_claim(false);
    }

    fn set_locked(&self, locked: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_locked != locked;
            s.is_locked = locked;
            changed
        });
    }
}
