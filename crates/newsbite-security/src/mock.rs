//! In-memory platform doubles for tests and the harness

use crate::integrity::SecurityAdvisory;
use crate::platform::{
    AdvisoryPresenter, AuthenticationOutcome, AuthenticationProvider, IntegrityChecker,
    PromptOptions, ScreenCaptureControl,
};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Scriptable authentication provider.
///
/// With [`hold_prompts`](Self::hold_prompts) each prompt blocks until
/// [`release_prompt`](Self::release_prompt), which lets tests observe the
/// controller while a prompt is on screen.
pub struct MockAuthenticator {
    has_hardware: AtomicBool,
    enrolled: AtomicBool,
    default_outcome: Mutex<AuthenticationOutcome>,
    scripted: Mutex<VecDeque<AuthenticationOutcome>>,
    error: Mutex<Option<String>>,
    hold: AtomicBool,
    held: AtomicUsize,
    started: Notify,
    release: Notify,
    prompts: AtomicUsize,
    last_options: Mutex<Option<PromptOptions>>,
}

impl MockAuthenticator {
    /// Hardware present, user enrolled, every prompt succeeds
    pub fn new() -> Self {
        Self {
            has_hardware: AtomicBool::new(true),
            enrolled: AtomicBool::new(true),
            default_outcome: Mutex::new(AuthenticationOutcome::Success),
            scripted: Mutex::new(VecDeque::new()),
            error: Mutex::new(None),
            hold: AtomicBool::new(false),
            held: AtomicUsize::new(0),
            started: Notify::new(),
            release: Notify::new(),
            prompts: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    /// Every prompt ends with `outcome`
    pub fn with_outcome(outcome: AuthenticationOutcome) -> Self {
        let mock = Self::new();
        mock.set_outcome(outcome);
        mock
    }

    /// Hardware present but nothing enrolled
    pub fn not_enrolled() -> Self {
        let mock = Self::new();
        mock.set_enrolled(false);
        mock
    }

    /// No authentication hardware
    pub fn no_hardware() -> Self {
        let mock = Self::new();
        mock.set_hardware(false);
        mock
    }

    /// Set hardware availability
    pub fn set_hardware(&self, present: bool) {
        self.has_hardware.store(present, Ordering::SeqCst);
    }

    /// Set enrollment
    pub fn set_enrolled(&self, enrolled: bool) {
        self.enrolled.store(enrolled, Ordering::SeqCst);
    }

    /// Outcome used once the script is exhausted
    pub fn set_outcome(&self, outcome: AuthenticationOutcome) {
        *self.default_outcome.lock() = outcome;
    }

    /// Queue outcomes for the next prompts, in order
    pub fn script(&self, outcomes: impl IntoIterator<Item = AuthenticationOutcome>) {
        self.scripted.lock().extend(outcomes);
    }

    /// Make prompts fail with a platform error (`None` clears)
    pub fn set_error(&self, message: Option<&str>) {
        *self.error.lock() = message.map(str::to_string);
    }

    /// Block prompts until released
    pub fn hold_prompts(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    /// Let one held prompt finish
    pub fn release_prompt(&self) {
        self.release.notify_one();
    }

    /// Wait until a held prompt is on screen
    pub async fn wait_for_prompt(&self) {
        loop {
            let started = self.started.notified();
            if self.held.load(Ordering::SeqCst) > 0 {
                return;
            }
            started.await;
        }
    }

    /// Number of prompts shown
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Options passed to the most recent prompt
    pub fn last_options(&self) -> Option<PromptOptions> {
        self.last_options.lock().clone()
    }
}

impl Default for MockAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthenticationProvider for MockAuthenticator {
    async fn has_hardware(&self) -> Result<bool> {
        Ok(self.has_hardware.load(Ordering::SeqCst))
    }

    async fn is_enrolled(&self) -> Result<bool> {
        Ok(self.enrolled.load(Ordering::SeqCst))
    }

    async fn authenticate(&self, options: &PromptOptions) -> Result<AuthenticationOutcome> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock() = Some(options.clone());

        if self.hold.load(Ordering::SeqCst) {
            let _held = HeldPrompt::enter(&self.held);
            self.started.notify_waiters();
            self.release.notified().await;
        }

        if let Some(message) = self.error.lock().clone() {
            return Err(Error::Platform(message));
        }
        let scripted = self.scripted.lock().pop_front();
        Ok(scripted.unwrap_or(*self.default_outcome.lock()))
    }
}

/// Counts a prompt as held until dropped (including on abort)
struct HeldPrompt<'a>(&'a AtomicUsize);

impl<'a> HeldPrompt<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for HeldPrompt<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-answer integrity checker
pub struct MockIntegrityChecker {
    answer: std::result::Result<bool, String>,
    calls: AtomicUsize,
}

impl MockIntegrityChecker {
    /// Device reports as rooted/jailbroken
    pub fn compromised() -> Self {
        Self::answering(Ok(true))
    }

    /// Device reports as intact
    pub fn intact() -> Self {
        Self::answering(Ok(false))
    }

    /// Check fails with `message`
    pub fn failing(message: &str) -> Self {
        Self::answering(Err(message.to_string()))
    }

    fn answering(answer: std::result::Result<bool, String>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of checks run
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntegrityChecker for MockIntegrityChecker {
    async fn is_compromised(&self) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(Error::Platform)
    }
}

/// Platform capture call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCall {
    /// `prevent()`
    Prevent,
    /// `allow()`
    Allow,
}

/// Screen capture control that records calls
#[derive(Default)]
pub struct MockScreenCapture {
    calls: Mutex<Vec<CaptureCall>>,
    failing: AtomicBool,
}

impl MockScreenCapture {
    /// Create recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful calls in order
    pub fn calls(&self) -> Vec<CaptureCall> {
        self.calls.lock().clone()
    }

    /// Whether the last successful call was `prevent`
    pub fn is_preventing(&self) -> bool {
        self.calls.lock().last() == Some(&CaptureCall::Prevent)
    }

    fn record(&self, call: CaptureCall) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Platform(format!("{:?} rejected", call)));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl ScreenCaptureControl for MockScreenCapture {
    fn prevent(&self) -> Result<()> {
        self.record(CaptureCall::Prevent)
    }

    fn allow(&self) -> Result<()> {
        self.record(CaptureCall::Allow)
    }
}

/// Advisory presenter that keeps what it was asked to show
#[derive(Default)]
pub struct RecordingAdvisoryPresenter {
    presented: Mutex<Vec<SecurityAdvisory>>,
}

impl RecordingAdvisoryPresenter {
    /// Create recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Advisories shown so far
    pub fn presented(&self) -> Vec<SecurityAdvisory> {
        self.presented.lock().clone()
    }
}

impl AdvisoryPresenter for RecordingAdvisoryPresenter {
    fn present(&self, advisory: &SecurityAdvisory) {
        tracing::debug!("Advisory presented: {}", advisory.title);
        self.presented.lock().push(advisory.clone());
    }
}
