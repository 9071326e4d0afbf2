//! Wait strategies.
//!
//! A [`WaitSpec`] is built per call and evaluated by polling: each poll
//! re-resolves the target selector, so a wait never trusts an element
//! snapshot taken on an earlier poll. Every wait is bounded by its own
//! timeout and fails with a specific error kind:
//!
//! - the selector still matched nothing: [`HarnessError::SelectorNotFound`]
//! - the selector still matched several: [`HarnessError::SelectorAmbiguous`]
//! - the element resolved but the condition never held:
//!   [`HarnessError::DomWaitTimeout`]

use crate::config::Timeouts;
use crate::driver::{Driver, ElementHandle};
use crate::result::{HarnessError, HarnessResult};
use crate::selector::{Pick, Selector, SelectorCatalog};
use std::time::Duration;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// CONDITIONS
// =============================================================================

/// What a wait is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Resolved and rendered
    Visible,
    /// Visible and not disabled
    Enabled,
    /// No visible element the pick rule could choose
    Absent,
    /// Visible with rendered text containing the string
    ContainsText(String),
}

impl WaitCondition {
    fn satisfied_by(&self, element: &ElementHandle) -> bool {
        match self {
            Self::Visible => element.visible,
            Self::Enabled => element.visible && element.enabled,
            Self::ContainsText(text) => element.visible && element.text.contains(text.as_str()),
            Self::Absent => !element.visible,
        }
    }
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visible => f.write_str("visible"),
            Self::Enabled => f.write_str("enabled"),
            Self::Absent => f.write_str("absent"),
            Self::ContainsText(text) => write!(f, "visible with text {text:?}"),
        }
    }
}

/// One bounded wait on one selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    /// Condition to reach
    pub condition: WaitCondition,
    /// Upper bound
    pub timeout: Duration,
    /// Element the condition applies to
    pub target: Selector,
}

impl WaitSpec {
    /// Wait until the target is visible
    #[must_use]
    pub const fn visible(target: Selector, timeout: Duration) -> Self {
        Self {
            condition: WaitCondition::Visible,
            timeout,
            target,
        }
    }

    /// Wait until the target is visible and enabled
    #[must_use]
    pub const fn enabled(target: Selector, timeout: Duration) -> Self {
        Self {
            condition: WaitCondition::Enabled,
            timeout,
            target,
        }
    }

    /// Wait until the target is gone or hidden
    #[must_use]
    pub const fn absent(target: Selector, timeout: Duration) -> Self {
        Self {
            condition: WaitCondition::Absent,
            timeout,
            target,
        }
    }

    /// Wait until the target shows `text`
    #[must_use]
    pub fn contains_text(target: Selector, text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            condition: WaitCondition::ContainsText(text.into()),
            timeout,
            target,
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// The loading spinner is gone
pub fn spinner_absent(catalog: &SelectorCatalog, timeouts: &Timeouts) -> HarnessResult<WaitSpec> {
    Ok(WaitSpec::absent(
        catalog.selector(crate::catalog::shell::SPINNER)?,
        timeouts.spinner(),
    ))
}

/// A notification shows `text`
pub fn notification_contains(
    catalog: &SelectorCatalog,
    text: &str,
    timeouts: &Timeouts,
) -> HarnessResult<WaitSpec> {
    Ok(WaitSpec::contains_text(
        catalog.selector(crate::catalog::shell::NOTIFICATION)?,
        text,
        timeouts.command(),
    ))
}

// =============================================================================
// WAITER
// =============================================================================

enum Poll {
    Done(Option<ElementHandle>),
    Pending(Option<HarnessError>),
}

/// Polls wait specs against a driver
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    poll_interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl Waiter {
    /// Create a waiter
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Waiter using the configured poll interval
    #[must_use]
    pub const fn from_timeouts(timeouts: &Timeouts) -> Self {
        Self::new(timeouts.poll_interval())
    }

    /// Poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll until the condition holds; returns the element it held for
    /// (`None` for [`WaitCondition::Absent`])
    pub async fn until(
        &self,
        driver: &dyn Driver,
        spec: &WaitSpec,
    ) -> HarnessResult<Option<ElementHandle>> {
        let deadline = tokio::time::Instant::now() + spec.timeout;
        loop {
            let last = match self.poll(driver, spec).await? {
                Poll::Done(element) => return Ok(element),
                Poll::Pending(last) => last,
            };
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(Self::expired(spec, last));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn poll(&self, driver: &dyn Driver, spec: &WaitSpec) -> HarnessResult<Poll> {
        if spec.condition == WaitCondition::Absent {
            let candidates = match spec.target.candidates(driver).await {
                Ok(found) => found,
                Err(HarnessError::SelectorNotFound { .. }) => return Ok(Poll::Done(None)),
                Err(e) => return Err(e),
            };
            let visible = candidates.iter().filter(|e| e.visible).count();
            let gone = match spec.target.pick {
                Pick::Exactly | Pick::First => visible == 0,
                Pick::Nth(n) => visible <= n,
            };
            return Ok(if gone {
                Poll::Done(None)
            } else {
                Poll::Pending(None)
            });
        }
        match spec.target.find(driver).await {
            Ok(element) if spec.condition.satisfied_by(&element) => Ok(Poll::Done(Some(element))),
            Ok(_) => Ok(Poll::Pending(None)),
            Err(e @ (HarnessError::SelectorNotFound { .. } | HarnessError::SelectorAmbiguous { .. })) => {
                Ok(Poll::Pending(Some(e)))
            }
            Err(e) => Err(e),
        }
    }

    fn expired(spec: &WaitSpec, last: Option<HarnessError>) -> HarnessError {
        let timeout_ms = spec.timeout_ms();
        tracing::debug!(role = %spec.target.role, condition = %spec.condition, timeout_ms, "wait expired");
        match last {
            Some(HarnessError::SelectorNotFound { role, selector, .. }) => {
                HarnessError::SelectorNotFound {
                    role,
                    selector,
                    timeout_ms: Some(timeout_ms),
                }
            }
            Some(ambiguous @ HarnessError::SelectorAmbiguous { .. }) => ambiguous,
            _ => HarnessError::DomWaitTimeout {
                role: spec.target.role.clone(),
                condition: spec.condition.to_string(),
                timeout_ms,
            },
        }
    }

    /// Poll the current URL until `predicate` accepts it; returns that URL
    pub async fn until_url<F>(
        &self,
        driver: &dyn Driver,
        description: &str,
        predicate: F,
        timeout: Duration,
    ) -> HarnessResult<String>
    where
        F: Fn(&str) -> bool + Send + Sync,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let url = driver.current_url().await?;
            if predicate(&url) {
                return Ok(url);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::debug!(url = %url, description, "url wait expired");
                return Err(HarnessError::DomWaitTimeout {
                    role: "location".to_string(),
                    condition: description.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Whether a URL path has `segment` as one of its `/`-separated segments
#[must_use]
pub fn has_path_segment(url: &str, segment: &str) -> bool {
    crate::driver::url_path(url)
        .split('/')
        .any(|s| s == segment)
}
