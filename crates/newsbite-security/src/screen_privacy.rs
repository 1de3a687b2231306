//! Screen-capture privacy
//!
//! Suppresses screenshots, recording and app-switcher previews while any
//! claim is held:
//! - the app lock while the app is backgrounded and locked
//! - the manual toggle (`set_screen_privacy`)
//! - sensitive screens through [`ScreenPrivacyGuard`]
//!
//! The platform `prevent` is issued when the first claim appears and `allow`
//! when the last one goes away. Platform failures are logged and retried on
//! the next claim change.

use crate::platform::ScreenCaptureControl;
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of a capture-suppression claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivacyClaim {
    /// App lock engaged on backgrounding
    AppLock,
    /// Explicit consumer toggle
    Manual,
    /// A sensitive screen holding a guard
    Screen,
}

#[derive(Debug, Default)]
struct Claims {
    app_lock: bool,
    manual: bool,
    screens: u32,
    /// Last state successfully applied to the platform
    applied: bool,
}

impl Claims {
    fn count(&self) -> u32 {
        u32::from(self.app_lock) + u32::from(self.manual) + self.screens
    }
}

/// Counted screen-capture suppression
pub struct ScreenPrivacy {
    control: Option<Arc<dyn ScreenCaptureControl>>,
    claims: Mutex<Claims>,
}

impl ScreenPrivacy {
    /// Create with the platform control, or `None` where capture cannot be
    /// suppressed (web)
    pub fn new(control: Option<Arc<dyn ScreenCaptureControl>>) -> Self {
        Self {
            control,
            claims: Mutex::new(Claims::default()),
        }
    }

    /// Set or clear the app lock's claim
    pub fn set_lock_claim(&self, held: bool) {
        self.update(PrivacyClaim::AppLock, |claims| claims.app_lock = held);
    }

    /// Set or clear the manual claim
    pub fn set_manual_claim(&self, held: bool) {
        self.update(PrivacyClaim::Manual, |claims| claims.manual = held);
    }

    /// Hold a claim for as long as the returned guard lives
    pub fn protect(self: &Arc<Self>) -> ScreenPrivacyGuard {
        self.update(PrivacyClaim::Screen, |claims| claims.screens += 1);
        ScreenPrivacyGuard {
            privacy: Arc::clone(self),
        }
    }

    /// Whether suppression is currently applied on the platform
    pub fn is_protected(&self) -> bool {
        self.claims.lock().applied
    }

    /// Number of claims held
    pub fn claim_count(&self) -> u32 {
        self.claims.lock().count()
    }

    fn release_screen(&self) {
        self.update(PrivacyClaim::Screen, |claims| {
            claims.screens = claims.screens.saturating_sub(1)
        });
    }

    // The platform call happens under the lock so prevent/allow stay ordered
    fn update(&self, claim: PrivacyClaim, change: impl FnOnce(&mut Claims)) {
        let mut claims = self.claims.lock();
        change(&mut claims);

        let wanted = claims.count() > 0;
        tracing::debug!(
            "Screen privacy claim {:?} updated (claims: {})",
            claim,
            claims.count()
        );
        if wanted == claims.applied {
            return;
        }

        let Some(control) = &self.control else {
            return;
        };
        let result = if wanted {
            control.prevent()
        } else {
            control.allow()
        };
        match result {
            Ok(()) => {
                claims.applied = wanted;
                tracing::debug!(
                    "Screen capture {}",
                    if wanted { "prevented" } else { "allowed" }
                );
            }
            Err(e) => tracing::warn!("Screen capture update failed: {}", e),
        }
    }
}

/// RAII claim held by a sensitive screen.
///
/// Dropping the guard releases the claim (and lifts suppression if it was
/// the last one).
pub struct ScreenPrivacyGuard {
    privacy: Arc<ScreenPrivacy>,
}

impl std::fmt::Debug for ScreenPrivacyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScreenPrivacyGuard")
    }
}

impl Drop for ScreenPrivacyGuard {
    fn drop(&mut self) {
        self.privacy.release_screen();
    }
}
