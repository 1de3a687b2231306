//! Root/jailbreak advisory
//!
//! The check runs at most once per process. A compromised device is flagged
//! and the user is informed; nothing is blocked.

use crate::platform::{AdvisoryPresenter, IntegrityChecker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Text of the compromised-device dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityAdvisory {
    /// Dialog title
    pub title: String,
    /// Dialog body
    pub message: String,
    /// Label of the single dismiss button
    pub acknowledge_label: String,
}

impl Default for SecurityAdvisory {
    fn default() -> Self {
        Self {
            title: "Security Warning".to_string(),
            message: "This device appears to be rooted/jailbroken. Newsbite may not function securely."
                .to_string(),
            acknowledge_label: "I understand".to_string(),
        }
    }
}

/// Single-flight integrity check
pub struct IntegrityMonitor {
    checker: Option<Arc<dyn IntegrityChecker>>,
    presenter: Option<Arc<dyn AdvisoryPresenter>>,
    advisory: SecurityAdvisory,
    result: OnceCell<bool>,
}

impl IntegrityMonitor {
    /// Create monitor. Without a checker the device is reported as intact.
    pub fn new(
        checker: Option<Arc<dyn IntegrityChecker>>,
        presenter: Option<Arc<dyn AdvisoryPresenter>>,
        advisory: SecurityAdvisory,
    ) -> Self {
        Self {
            checker,
            presenter,
            advisory,
            result: OnceCell::new(),
        }
    }

    /// Run the check on first call; later and concurrent calls share the result.
    ///
    /// Returns whether the device is compromised. Checker errors count as
    /// not compromised.
    pub async fn check_once(&self) -> bool {
        *self.result.get_or_init(|| self.run()).await
    }

    /// Result of a completed check
    pub fn result(&self) -> Option<bool> {
        self.result.get().copied()
    }

    async fn run(&self) -> bool {
        let Some(checker) = &self.checker else {
            tracing::debug!("No integrity checker; skipping root check");
            return false;
        };

        let compromised = match checker.is_compromised().await {
            Ok(compromised) => compromised,
            Err(e) => {
                tracing::warn!("Root check failed: {}", e);
                false
            }
        };

        if compromised {
            tracing::warn!("Device integrity compromised (rooted/jailbroken)");
            if let Some(presenter) = &self.presenter {
                presenter.present(&self.advisory);
            }
        }
        compromised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockIntegrityChecker, RecordingAdvisoryPresenter};

    #[tokio::test]
    async fn test_compromised_presents_once() {
        let checker = Arc::new(MockIntegrityChecker::compromised());
        let presenter = Arc::new(RecordingAdvisoryPresenter::new());
        let monitor = IntegrityMonitor::new(
            Some(checker.clone()),
            Some(presenter.clone()),
            SecurityAdvisory::default(),
        );

        assert!(monitor.check_once().await);
        assert!(monitor.check_once().await);
        assert_eq!(checker.calls(), 1);
        assert_eq!(presenter.presented().len(), 1);
        assert_eq!(presenter.presented()[0].title, "Security Warning");
    }

    #[tokio::test]
    async fn test_checker_error_is_intact() {
        let monitor = IntegrityMonitor::new(
            Some(Arc::new(MockIntegrityChecker::failing("probe crashed"))),
            None,
            SecurityAdvisory::default(),
        );
        assert!(!monitor.check_once().await);
        assert_eq!(monitor.result(), Some(false));
    }

    #[tokio::test]
    async fn test_no_checker() {
        let monitor = IntegrityMonitor::new(None, None, SecurityAdvisory::default());
        assert_eq!(monitor.result(), None);
        assert!(!monitor.check_once().await);
    }
}
