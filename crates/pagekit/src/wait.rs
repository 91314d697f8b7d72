//! Wait mechanisms.
//!
//! Two forms share the driver's bounded poll:
//!
//! - [`Waiter::until`]: poll a condition directly.
//! - [`WaitScope`]: capture a baseline before an action, then block after it
//!   until the page has moved on. [`WaitScope::around`] wraps a closure;
//!   [`WaitScope::begin`] returns a [`WaitGuard`] whose exit check also runs
//!   on drop.
//!
//! ```ignore
//! page.wait_page_loaded().around(|| page.element("submit")?.click())?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::driver::{ElementHandle, READY_STATE_SCRIPT};
use crate::locator::{Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::page_object::UrlMatcher;
use crate::result::{PageError, PageResult};
use crate::session::Session;

/// Script reporting jQuery idle
pub const JQUERY_IDLE_SCRIPT: &str = "return jQuery.active == 0;";

/// Script reporting ASP.NET AJAX idle
pub const ASPNET_IDLE_SCRIPT: &str =
    "return Sys.WebForms.PageRequestManager.getInstance().get_isInAsyncPostBack() == false;";

// =============================================================================
// POLLING
// =============================================================================

/// Bounded poll over a fallible condition.
///
/// Driver errors go through [`Driver::poll_until`](crate::Driver::poll_until)
/// (transient ones retry); any other error ends the poll and is returned.
pub(crate) fn poll(
    session: &Session,
    timeout: Duration,
    interval: Duration,
    mut condition: impl FnMut() -> PageResult<bool>,
) -> PageResult<bool> {
    let mut failure = None;
    let outcome = session
        .driver()
        .poll_until(timeout, interval, &mut || match condition() {
            Ok(done) => Ok(done),
            Err(PageError::Driver(err)) => Err(err),
            Err(err) => {
                failure = Some(err);
                Ok(true)
            }
        });
    if let Some(err) = failure {
        return Err(err);
    }
    Ok(outcome?)
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Whether the active document reports `readyState == "complete"`
pub fn document_ready(session: &Session) -> PageResult<bool> {
    Ok(truthy(&session.driver().execute_script(READY_STATE_SCRIPT)?))
}

fn root_handle(session: &Session) -> PageResult<Option<ElementHandle>> {
    Ok(session
        .driver()
        .find_elements(&Locator::tag_name("html"), None)?
        .into_iter()
        .next())
}

// =============================================================================
// OPTIONS / RESULT
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Log a timeout instead of failing
    pub ignore_timeout: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            ignore_timeout: false,
        }
    }
}

impl WaitOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options matching a session's configuration
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        let config = session.config();
        Self {
            timeout_ms: config.default_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
            ignore_timeout: false,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    #[must_use]
    pub const fn with_ignore_timeout(mut self, ignore: bool) -> Self {
        self.ignore_timeout = ignore;
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Whether the condition was met
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    #[must_use]
    pub fn success(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            success: true,
            elapsed,
            waited_for: waited_for.into(),
        }
    }

    #[must_use]
    pub fn timeout(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            success: false,
            elapsed,
            waited_for: waited_for.into(),
        }
    }
}

fn finish(options: WaitOptions, start: Instant, description: String, met: bool) -> PageResult<WaitResult> {
    if met {
        tracing::debug!("Waited {:?} for {}", start.elapsed(), description);
        return Ok(WaitResult::success(start.elapsed(), description));
    }
    if options.ignore_timeout {
        tracing::warn!(
            "Ignoring timeout after {}ms waiting for {}",
            options.timeout_ms,
            description
        );
        return Ok(WaitResult::timeout(start.elapsed(), description));
    }
    Err(PageError::WaitTimeout {
        waited_for: description,
        timeout_ms: options.timeout_ms,
    })
}

// =============================================================================
// DIRECT WAIT
// =============================================================================

/// Polls a condition against a session
#[derive(Debug, Clone)]
pub struct Waiter {
    session: Session,
    options: WaitOptions,
}

impl Waiter {
    /// Waiter using the session's timeout and poll interval
    #[must_use]
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            options: WaitOptions::for_session(session),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub const fn ignore_timeout(mut self) -> Self {
        self.options.ignore_timeout = true;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Poll `condition` until it holds; `WaitTimeout` when it never does
    pub fn until<F>(&self, description: &str, mut condition: F) -> PageResult<WaitResult>
    where
        F: FnMut(&Session) -> PageResult<bool>,
    {
        let start = Instant::now();
        let session = &self.session;
        let met = poll(
            session,
            self.options.timeout(),
            self.options.poll_interval(),
            || condition(session),
        )?;
        finish(self.options, start, description.to_string(), met)
    }
}

// =============================================================================
// WAIT KINDS
// =============================================================================

/// AJAX library whose activity flag to poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AjaxLibrary {
    JQuery,
    AspNet,
    /// A script that returns true when idle
    Custom(String),
}

impl AjaxLibrary {
    #[must_use]
    pub fn script(&self) -> &str {
        match self {
            Self::JQuery => JQUERY_IDLE_SCRIPT,
            Self::AspNet => ASPNET_IDLE_SCRIPT,
            Self::Custom(script) => script,
        }
    }
}

/// Where an element wait looks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementTarget {
    pub locator: Locator,
    /// Search root; the document when `None`
    pub root: Option<ElementHandle>,
}

impl ElementTarget {
    fn matches(&self, session: &Session) -> PageResult<Vec<ElementHandle>> {
        Ok(session
            .driver()
            .find_elements(&self.locator, self.root.as_ref())?)
    }
}

type ConditionFn = Arc<dyn Fn(&Session) -> PageResult<bool> + Send + Sync>;

/// A named custom exit condition
#[derive(Clone)]
pub struct Condition {
    description: String,
    check: ConditionFn,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Condition {
    pub fn new(
        description: impl Into<String>,
        check: impl Fn(&Session) -> PageResult<bool> + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }
}

/// What a wait scope blocks on at exit
#[derive(Debug, Clone)]
pub enum WaitKind {
    /// The `<html>` element was replaced and the new document is ready
    PageLoaded,
    /// The URL differs from the one at entry
    UrlChanged,
    /// The URL path matches a pattern
    UrlMatches(UrlMatcher),
    /// More windows are open than at entry
    NewWindow,
    /// The AJAX library reports idle
    Ajax(AjaxLibrary),
    /// The element exists and is displayed
    ElementDisplayed(ElementTarget),
    /// No matching element is displayed
    ElementDisappeared(ElementTarget),
    /// The first match is a different element than at entry
    ElementChanged(ElementTarget),
    /// A custom condition holds
    Condition(Condition),
}

impl WaitKind {
    /// Custom exit condition
    pub fn condition(
        description: impl Into<String>,
        check: impl Fn(&Session) -> PageResult<bool> + Send + Sync + 'static,
    ) -> Self {
        Self::Condition(Condition::new(description, check))
    }

    /// Human-readable description for logs and timeouts
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PageLoaded => "page load".to_string(),
            Self::UrlChanged => "URL change".to_string(),
            Self::UrlMatches(m) => format!("URL matching {}", m.pattern()),
            Self::NewWindow => "new window".to_string(),
            Self::Ajax(lib) => format!("AJAX idle ({})", lib.script()),
            Self::ElementDisplayed(t) => format!("{} displayed", t.locator),
            Self::ElementDisappeared(t) => format!("{} disappeared", t.locator),
            Self::ElementChanged(t) => format!("{} changed", t.locator),
            Self::Condition(c) => c.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Baseline {
    Nothing,
    Root(Option<ElementHandle>),
    Url(String),
    Windows(usize),
    Element(Option<ElementHandle>),
}

impl Baseline {
    fn capture(kind: &WaitKind, session: &Session) -> PageResult<Self> {
        Ok(match kind {
            WaitKind::PageLoaded => Self::Root(root_handle(session)?),
            WaitKind::UrlChanged => Self::Url(session.current_url()?),
            WaitKind::NewWindow => Self::Windows(session.window_handles()?.len()),
            WaitKind::ElementChanged(target) => {
                Self::Element(target.matches(session)?.into_iter().next())
            }
            _ => Self::Nothing,
        })
    }
}

fn exit_condition_met(kind: &WaitKind, baseline: &Baseline, session: &Session) -> PageResult<bool> {
    let driver = session.driver();
    match (kind, baseline) {
        (WaitKind::PageLoaded, Baseline::Root(before)) => {
            let now = root_handle(session)?;
            Ok(now.is_some() && now != *before && document_ready(session)?)
        }
        (WaitKind::UrlChanged, Baseline::Url(before)) => Ok(session.current_url()? != *before),
        (WaitKind::UrlMatches(matcher), _) => Ok(matcher.matches(&session.current_url()?)),
        (WaitKind::NewWindow, Baseline::Windows(before)) => {
            Ok(session.window_handles()?.len() > *before)
        }
        (WaitKind::Ajax(lib), _) => Ok(truthy(&driver.execute_script(lib.script())?)),
        (WaitKind::ElementDisplayed(target), _) => match target.matches(session)?.first() {
            Some(handle) => Ok(driver.is_displayed(handle)?),
            None => Ok(false),
        },
        (WaitKind::ElementDisappeared(target), _) => {
            for handle in target.matches(session)? {
                if driver.is_displayed(&handle)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (WaitKind::ElementChanged(target), Baseline::Element(before)) => {
            let now = target.matches(session)?.into_iter().next();
            Ok(now.is_some() && now != *before)
        }
        (WaitKind::Condition(condition), _) => (condition.check)(session),
        (kind, baseline) => Err(PageError::ConfigError {
            message: format!("baseline {baseline:?} does not fit {}", kind.describe()),
        }),
    }
}

// =============================================================================
// SCOPED WAIT
// =============================================================================

/// A wait-after-action, not yet entered
#[derive(Debug, Clone)]
pub struct WaitScope {
    session: Session,
    kind: WaitKind,
    options: WaitOptions,
}

impl WaitScope {
    /// Scope using the session's timeout and poll interval
    #[must_use]
    pub fn new(session: &Session, kind: WaitKind) -> Self {
        Self {
            session: session.clone(),
            kind,
            options: WaitOptions::for_session(session),
        }
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Log a timeout at exit instead of failing
    #[must_use]
    pub const fn ignore_timeout(mut self) -> Self {
        self.options.ignore_timeout = true;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> &WaitKind {
        &self.kind
    }

    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Capture the baseline and enter the scope
    pub fn begin(self) -> PageResult<WaitGuard> {
        let baseline = Baseline::capture(&self.kind, &self.session)?;
        tracing::debug!("Entering wait for {} ({:?})", self.kind.describe(), baseline);
        Ok(WaitGuard {
            session: self.session,
            kind: self.kind,
            options: self.options,
            baseline,
            finished: false,
        })
    }

    /// Run `body` inside the scope.
    ///
    /// The exit check runs exactly once whether or not the body fails; a
    /// body error wins over a wait error.
    pub fn around<T>(self, body: impl FnOnce() -> PageResult<T>) -> PageResult<T> {
        let guard = self.begin()?;
        let outcome = body();
        let waited = guard.end();
        match outcome {
            Ok(value) => waited.map(|_| value),
            Err(err) => {
                if let Err(wait_err) = waited {
                    tracing::warn!("Wait after failed action also failed: {}", wait_err);
                }
                Err(err)
            }
        }
    }
}

/// An entered wait scope; the exit check runs on [`end`](Self::end) or drop
#[derive(Debug)]
pub struct WaitGuard {
    session: Session,
    kind: WaitKind,
    options: WaitOptions,
    baseline: Baseline,
    finished: bool,
}

impl WaitGuard {
    fn exit(&mut self) -> PageResult<WaitResult> {
        self.finished = true;
        let start = Instant::now();
        let (kind, baseline, session) = (&self.kind, &self.baseline, &self.session);
        let met = poll(
            session,
            self.options.timeout(),
            self.options.poll_interval(),
            || exit_condition_met(kind, baseline, session),
        )?;
        finish(self.options, start, kind.describe(), met)
    }

    /// Block until the exit condition holds
    pub fn end(mut self) -> PageResult<WaitResult> {
        self.exit()
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if !self.finished && !std::thread::panicking() {
            if let Err(err) = self.exit() {
                tracing::warn!("Wait at scope exit failed: {}", err);
            }
        }
    }
}
