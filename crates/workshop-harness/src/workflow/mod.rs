//! Workflow orchestration.
//!
//! ```text
//!  Scenario::begin ──▶ session applied, intercept rules registered
//!        │
//!        ▼
//!  Flow<S>:  Idle ──▶ ... ──▶ final state
//!              │        │
//!              └────────┴──▶ Failed (out of band, from any state)
//!        │
//!        ▼
//!  FlowFailure { furthest state, operation, originating error, diagnostics }
//! ```
//!
//! Each business flow is an explicit state machine. A step runs its page
//! operations and intercept awaits, then advances; an error moves the flow
//! to `Failed` and is returned with the furthest state reached.

use crate::capability::Surface;
use crate::catalog;
use crate::config::RunConfig;
use crate::driver::{Driver, DriverFactory};
use crate::intercept::{InterceptRegistry, InterceptRule};
use crate::result::{ErrorKind, HarnessError, HarnessResult};
use crate::session::{Authenticator, Session, SessionCache};
use crate::trace::{ActionTrace, Diagnostics};
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub mod customer_edit;
pub mod job_print;
pub mod part_creation;
pub mod part_merge;
pub mod stock_adjustment;

pub use customer_edit::{edit_customer_details, open_first_job, CustomerEditOutcome, CustomerEditState};
pub use job_print::{print_first_job_card, JobPrintState};
pub use part_creation::{create_part, PartCreationState};
pub use part_merge::{
    merge_first_two_parts, review_merge, validate_merge_history, MergeOutcome, MergeState,
};
pub use stock_adjustment::{adjust_stock, on_hand_from_history, StockAdjustmentOutcome, StockAdjustmentState};

/// Trace entries bundled into diagnostics
const DIAGNOSTIC_TRACE_TAIL: usize = 50;

// =============================================================================
// STATE MACHINE
// =============================================================================

/// States of one orchestrated flow
pub trait FlowState: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Flow name used in errors and reports
    const FLOW: &'static str;

    /// State every flow starts in
    fn initial() -> Self;

    /// Out-of-band terminal state
    fn failed() -> Self;

    /// States reachable in one step, `Failed` excluded
    fn successors(self) -> &'static [Self];

    /// Every state, `Failed` included
    fn all() -> &'static [Self];

    /// State name
    fn name(self) -> &'static str;

    /// Whether reaching this state completes the flow
    fn is_final(self) -> bool;
}

/// A flow in progress
#[derive(Debug, Clone)]
pub struct Flow<S: FlowState> {
    state: S,
    furthest: S,
    history: Vec<(S, Instant)>,
}

impl<S: FlowState> Default for Flow<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FlowState> Flow<S> {
    /// Flow in its initial state
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: S::initial(),
            furthest: S::initial(),
            history: vec![(S::initial(), Instant::now())],
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> S {
        self.state
    }

    /// Last state reached before any failure
    #[must_use]
    pub const fn furthest(&self) -> S {
        self.furthest
    }

    /// States entered, in order
    #[must_use]
    pub fn history(&self) -> &[(S, Instant)] {
        &self.history
    }

    /// When `state` was entered
    #[must_use]
    pub fn entered_at(&self, state: S) -> Option<Instant> {
        self.history
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, at)| *at)
    }

    /// Whether the flow reached a final state
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_final()
    }

    /// Move to `to`; only declared successors are allowed
    pub fn advance(&mut self, to: S) -> HarnessResult<()> {
        if !self.state.successors().contains(&to) {
            return Err(HarnessError::precondition(
                S::FLOW,
                format!("cannot move from {} to {}", self.state.name(), to.name()),
            ));
        }
        tracing::info!(flow = S::FLOW, from = self.state.name(), to = to.name(), "flow advanced");
        self.state = to;
        self.furthest = to;
        self.history.push((to, Instant::now()));
        Ok(())
    }

    /// Fail unless the flow is in `expected`
    pub fn require(&self, expected: S) -> HarnessResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HarnessError::precondition(
                S::FLOW,
                format!("expected {} but flow is {}", expected.name(), self.state.name()),
            ))
        }
    }

    /// Move to `Failed` and describe where it happened
    pub fn fail(&mut self, operation: &str, error: HarnessError) -> FlowFailure {
        tracing::warn!(
            flow = S::FLOW,
            state = self.state.name(),
            operation,
            kind = %error.kind(),
            error = %error,
            "flow failed"
        );
        self.state = S::failed();
        self.history.push((S::failed(), Instant::now()));
        FlowFailure::new(S::FLOW, self.furthest.name(), operation, error)
    }

    /// Run one operation without changing state
    pub async fn attempt<T, F>(&mut self, operation: &str, work: F) -> Result<T, FlowFailure>
    where
        F: Future<Output = HarnessResult<T>>,
    {
        match work.await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.fail(operation, e)),
        }
    }

    /// Run one operation, then advance to `to`
    pub async fn step<T, F>(&mut self, operation: &str, to: S, work: F) -> Result<T, FlowFailure>
    where
        F: Future<Output = HarnessResult<T>>,
    {
        let value = self.attempt(operation, work).await?;
        if let Err(e) = self.advance(to) {
            return Err(self.fail(operation, e));
        }
        Ok(value)
    }
}

/// Structural defect in a flow's state table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineIssue {
    /// Not reachable from the initial state
    Orphaned(&'static str),
    /// Reachable, not final, no way forward
    DeadEnd(&'static str),
    /// No final state is reachable
    NoFinalState,
}

/// Check a flow's state table: every state reachable, no dead ends, some
/// final state reachable
#[must_use]
pub fn validate_machine<S: FlowState>() -> Vec<MachineIssue> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();
    let _ = reachable.insert(S::initial());
    queue.push_back(S::initial());
    while let Some(current) = queue.pop_front() {
        for next in current.successors() {
            if reachable.insert(*next) {
                queue.push_back(*next);
            }
        }
    }

    let mut issues = Vec::new();
    for state in S::all().iter().filter(|s| **s != S::failed()) {
        if !reachable.contains(state) {
            issues.push(MachineIssue::Orphaned(state.name()));
        } else if !state.is_final() && state.successors().is_empty() {
            issues.push(MachineIssue::DeadEnd(state.name()));
        }
    }
    if !reachable.iter().any(|s| s.is_final()) {
        issues.push(MachineIssue::NoFinalState);
    }
    issues
}

// =============================================================================
// FAILURE
// =============================================================================

/// A flow that stopped short of its final state
#[derive(Debug, thiserror::Error)]
#[error("{flow} failed during {operation} (furthest state {furthest_state}): {error}")]
pub struct FlowFailure {
    /// Flow name
    pub flow: String,
    /// Furthest state reached
    pub furthest_state: String,
    /// Operation that failed
    pub operation: String,
    /// Originating error, kind preserved
    #[source]
    pub error: HarnessError,
    /// Screenshot, trace and intercept state at failure time
    pub diagnostics: Option<Box<Diagnostics>>,
}

impl FlowFailure {
    /// Failure without diagnostics
    #[must_use]
    pub fn new(flow: &str, furthest_state: &str, operation: &str, error: HarnessError) -> Self {
        Self {
            flow: flow.to_string(),
            furthest_state: furthest_state.to_string(),
            operation: operation.to_string(),
            error,
            diagnostics: None,
        }
    }

    /// Kind of the originating error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

// =============================================================================
// SCENARIO
// =============================================================================

/// Data carried between the steps of one scenario
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    /// Text of the job row chosen from the job list
    pub selected_job: Option<String>,
    /// Id of the job being edited
    pub job_id: Option<String>,
    /// Codes of parts created so far
    pub created_parts: Vec<String>,
    /// Inventory group of the side menu is expanded
    pub inventory_menu_open: bool,
}

impl ScenarioContext {
    /// Empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// One scenario's browsing context, session and intercept registry
#[derive(Debug)]
pub struct Scenario {
    id: Uuid,
    driver: Arc<dyn Driver>,
    intercepts: InterceptRegistry,
    config: Arc<RunConfig>,
    trace: ActionTrace,
    session: Arc<Session>,
}

impl Scenario {
    /// Open a context, apply the cached session and register `rules`, all
    /// before the first navigation
    pub async fn begin<A: Authenticator>(
        factory: &dyn DriverFactory,
        sessions: &SessionCache<A>,
        config: Arc<RunConfig>,
        rules: Vec<InterceptRule>,
    ) -> HarnessResult<Self> {
        let driver = factory.open().await?;
        let session = sessions.get_or_create(&config.credentials).await?;
        driver.apply_storage_state(session.storage()).await?;
        let intercepts = InterceptRegistry::attach(driver.as_ref(), config.timeouts.intercept());
        intercepts.register_all(rules);
        let id = Uuid::new_v4();
        tracing::info!(scenario = %id, session = %session.id(), "scenario started");
        Ok(Self {
            id,
            driver,
            intercepts,
            trace: ActionTrace::new(config.trace_capacity),
            config,
            session,
        })
    }

    /// Scenario id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Browsing context
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Intercept registry
    #[must_use]
    pub const fn intercepts(&self) -> &InterceptRegistry {
        &self.intercepts
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Action trace
    #[must_use]
    pub const fn trace(&self) -> &ActionTrace {
        &self.trace
    }

    /// Session the context was started with
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Surface over the application shell; screens narrow it to their catalog
    #[must_use]
    pub fn surface(&self) -> Surface {
        Surface::new(
            Arc::clone(&self.driver),
            catalog::shell_v1(),
            Arc::clone(&self.config),
            self.trace.clone(),
        )
    }

    /// Attach screenshot, trace tail and intercept state to a failure
    pub async fn diagnose(&self, mut failure: FlowFailure) -> FlowFailure {
        let screenshot = match self.driver.screenshot().await {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(error = %e, "screenshot failed");
                None
            }
        };
        let url = self.driver.current_url().await.ok();
        let unresolved_alias = self
            .intercepts
            .unresolved_alias()
            .or_else(|| failure.error.alias().map(str::to_string));
        tracing::error!(
            scenario = %self.id,
            flow = %failure.flow,
            furthest_state = %failure.furthest_state,
            operation = %failure.operation,
            kind = %failure.kind(),
            unresolved_alias = ?unresolved_alias,
            "scenario failed"
        );
        failure.diagnostics = Some(Box::new(Diagnostics {
            scenario_id: self.id,
            flow: failure.flow.clone(),
            furthest_state: failure.furthest_state.clone(),
            operation: failure.operation.clone(),
            error_kind: failure.kind(),
            message: failure.error.to_string(),
            url,
            unresolved_alias,
            pending_aliases: self.intercepts.pending_aliases(),
            trace: self.trace.tail(DIAGNOSTIC_TRACE_TAIL),
            captured_at: Utc::now(),
            screenshot_bytes: screenshot.as_ref().map_or(0, Vec::len),
            screenshot,
        }));
        failure
    }

    /// Discard every pending intercept and close the browsing context
    pub async fn teardown(&mut self) {
        self.intercepts.teardown();
        if let Err(e) = self.driver.close().await {
            tracing::warn!(scenario = %self.id, error = %e, "closing browsing context failed");
        }
        tracing::info!(scenario = %self.id, "scenario torn down");
    }
}
