//! Run-level scenario retry.
//!
//! Individual waits never retry past their own timeout. The only re-attempt
//! is a whole scenario, bounded by the configured retry count.

use crate::config::RunConfig;
use crate::result::ErrorKind;
use crate::workflow::FlowFailure;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

/// One attempt of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    /// Attempt number, starting at 0
    pub attempt: u32,
    /// Whether the attempt passed
    pub passed: bool,
    /// Attempt duration in milliseconds
    pub duration_ms: u64,
    /// Kind of the originating error
    pub error_kind: Option<ErrorKind>,
    /// Flow that failed
    pub flow: Option<String>,
    /// Furthest state it reached
    pub furthest_state: Option<String>,
    /// Operation that failed
    pub operation: Option<String>,
    /// Error message
    pub message: Option<String>,
    /// Alias of the unresolved intercept
    pub unresolved_alias: Option<String>,
}

impl AttemptReport {
    fn passed(attempt: u32, duration_ms: u64) -> Self {
        Self {
            attempt,
            passed: true,
            duration_ms,
            error_kind: None,
            flow: None,
            furthest_state: None,
            operation: None,
            message: None,
            unresolved_alias: None,
        }
    }

    fn failed(attempt: u32, duration_ms: u64, failure: &FlowFailure) -> Self {
        let unresolved_alias = failure
            .diagnostics
            .as_ref()
            .and_then(|d| d.unresolved_alias.clone())
            .or_else(|| failure.error.alias().map(str::to_string));
        Self {
            attempt,
            passed: false,
            duration_ms,
            error_kind: Some(failure.kind()),
            flow: Some(failure.flow.clone()),
            furthest_state: Some(failure.furthest_state.clone()),
            operation: Some(failure.operation.clone()),
            message: Some(failure.error.to_string()),
            unresolved_alias,
        }
    }
}

/// Outcome of a scenario across its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Attempts in order
    pub attempts: Vec<AttemptReport>,
    /// Whether the last attempt passed
    pub passed: bool,
}

impl ScenarioReport {
    /// Number of attempts made
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// Passed only after at least one failed attempt
    #[must_use]
    pub fn is_flaky(&self) -> bool {
        self.passed && self.attempts.len() > 1
    }

    /// Last failed attempt
    #[must_use]
    pub fn last_failure(&self) -> Option<&AttemptReport> {
        self.attempts.iter().rev().find(|a| !a.passed)
    }

    /// JSON rendering for the reporting side
    pub fn to_json(&self) -> crate::result::HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs scenarios with a bounded number of whole-scenario retries
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRunner {
    retries: u32,
}

impl ScenarioRunner {
    /// Runner retrying each scenario up to `retries` extra times
    #[must_use]
    pub const fn new(retries: u32) -> Self {
        Self { retries }
    }

    /// Runner using the configured retry count
    #[must_use]
    pub const fn from_config(config: &RunConfig) -> Self {
        Self::new(config.retries)
    }

    /// Extra attempts allowed
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Run `attempt` until it passes or the retries are spent; each call
    /// receives the attempt number and must build its own scenario
    pub async fn run<F, Fut>(&self, name: &str, mut attempt: F) -> ScenarioReport
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), FlowFailure>>,
    {
        let mut attempts = Vec::new();
        let mut passed = false;
        for n in 0..=self.retries {
            let start = Instant::now();
            let outcome = attempt(n).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            match outcome {
                Ok(()) => {
                    tracing::info!(scenario = name, attempt = n, duration_ms, "scenario passed");
                    attempts.push(AttemptReport::passed(n, duration_ms));
                    passed = true;
                    break;
                }
                Err(failure) => {
                    tracing::warn!(
                        scenario = name,
                        attempt = n,
                        kind = %failure.kind(),
                        furthest_state = %failure.furthest_state,
                        operation = %failure.operation,
                        "scenario attempt failed"
                    );
                    attempts.push(AttemptReport::failed(n, duration_ms, &failure));
                }
            }
        }
        ScenarioReport {
            name: name.to_string(),
            attempts,
            passed,
        }
    }
}
