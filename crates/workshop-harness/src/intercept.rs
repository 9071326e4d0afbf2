//! Network Intercept Registry
//!
//! Correlates UI actions with the backend calls they trigger. Rules are
//! registered under an alias before the navigation or click that causes the
//! call; a scenario then suspends on [`InterceptRegistry::wait_for`] until a
//! matching call has completed.
//!
//! - Matching is method-exact and path-glob (`*` stays inside one path
//!   segment, `**` crosses segments).
//! - A call observed before its rule was registered is never attributed to
//!   that rule.
//! - Each await consumes one completed call, so two awaits on one alias need
//!   two distinct calls.
//! - A timeout is an [`HarnessError::InterceptTimeout`], never a DOM wait
//!   error.

use crate::driver::{Driver, NetworkEvent};
use crate::result::{HarnessError, HarnessResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

// =============================================================================
// HTTP METHOD
// =============================================================================

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// HEAD request
    Head,
    /// OPTIONS request
    Options,
}

impl HttpMethod {
    /// Parse a wire method name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// URL GLOB
// =============================================================================

/// Path glob matched against URLs with query and fragment removed
#[derive(Debug, Clone)]
pub struct UrlGlob {
    pattern: String,
    regex: Regex,
}

impl UrlGlob {
    /// Compile a glob such as `**/api/inventory/parts/*/stock`
    pub fn new(pattern: &str) -> HarnessResult<Self> {
        let mut source = String::with_capacity(pattern.len() * 2 + 2);
        source.push('^');
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '*' {
                if chars.peek() == Some(&'*') {
                    let _ = chars.next();
                    source.push_str(".*");
                } else {
                    source.push_str("[^/]*");
                }
            } else {
                source.push_str(&regex::escape(&c.to_string()));
            }
        }
        source.push('$');
        let regex = Regex::new(&source).map_err(|e| HarnessError::Config {
            message: format!("invalid URL glob `{pattern}`: {e}"),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Check a full URL
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(strip_query(url))
    }

    /// Original glob
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for UrlGlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

// =============================================================================
// RULES AND CALLS
// =============================================================================

/// Method + URL glob registered under an alias
#[derive(Debug, Clone)]
pub struct InterceptRule {
    /// HTTP method, matched exactly
    pub method: HttpMethod,
    /// URL glob
    pub pattern: UrlGlob,
    /// Stable alias
    pub alias: String,
}

impl InterceptRule {
    /// Create a rule
    pub fn new(method: HttpMethod, pattern: &str, alias: impl Into<String>) -> HarnessResult<Self> {
        Ok(Self {
            method,
            pattern: UrlGlob::new(pattern)?,
            alias: alias.into(),
        })
    }

    /// Check a request against this rule
    #[must_use]
    pub fn matches(&self, method: HttpMethod, url: &str) -> bool {
        self.method == method && self.pattern.matches(url)
    }
}

/// A completed call attributed to an alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedCall {
    /// Alias that observed the call
    pub alias: String,
    /// Driver request id
    pub request_id: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request URL
    pub url: String,
    /// Response status
    pub status: u16,
    /// When the request left the page
    pub requested_at: Instant,
    /// When the response arrived
    pub completed_at: Instant,
}

impl InterceptedCall {
    /// 2xx response
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail unless the response was 2xx
    pub fn expect_success(&self) -> HarnessResult<&Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HarnessError::assertion(format!(
                "@{} {} {} answered {}",
                self.alias, self.method, self.url, self.status
            )))
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug)]
struct ActiveRule {
    rule: InterceptRule,
    registered_at: Instant,
    generation: u64,
}

#[derive(Debug)]
struct PendingIntercept {
    alias: String,
    generation: u64,
    method: HttpMethod,
    url: String,
    requested_at: Instant,
}

/// Response seen before its request
#[derive(Debug, Clone, Copy)]
struct EarlyResponse {
    status: u16,
    at: Instant,
}

/// Responses kept while their request is still unseen; unmatched traffic
/// evicts the oldest
const EARLY_RESPONSE_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct RegistryState {
    rules: HashMap<String, ActiveRule>,
    pending: HashMap<String, Vec<PendingIntercept>>,
    completed: HashMap<String, VecDeque<InterceptedCall>>,
    early: HashMap<String, EarlyResponse>,
    early_order: VecDeque<String>,
    unresolved: Option<String>,
    next_generation: u64,
}

impl RegistryState {
    fn hold_early(&mut self, request_id: &str, response: EarlyResponse) {
        if self.early.insert(request_id.to_string(), response).is_none() {
            self.early_order.push_back(request_id.to_string());
        }
        while self.early.len() > EARLY_RESPONSE_CAPACITY {
            let Some(oldest) = self.early_order.pop_front() else {
                break;
            };
            let _ = self.early.remove(&oldest);
        }
    }

    fn take_early(&mut self, request_id: &str) -> Option<EarlyResponse> {
        let response = self.early.remove(request_id)?;
        self.early_order.retain(|id| id != request_id);
        Some(response)
    }

    /// Move `pending` calls of still-current rules to their alias queues
    fn complete(
        &mut self,
        request_id: &str,
        pending: Vec<PendingIntercept>,
        status: u16,
        at: Instant,
    ) -> bool {
        let mut resolved = false;
        for p in pending {
            let current = self
                .rules
                .get(&p.alias)
                .is_some_and(|active| active.generation == p.generation);
            if !current {
                continue;
            }
            tracing::debug!(alias = %p.alias, status, "intercept completed");
            self.completed
                .entry(p.alias.clone())
                .or_default()
                .push_back(InterceptedCall {
                    alias: p.alias,
                    request_id: request_id.to_string(),
                    method: p.method,
                    url: p.url,
                    status,
                    completed_at: at.max(p.requested_at),
                    requested_at: p.requested_at,
                });
            resolved = true;
        }
        resolved
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<RegistryState>,
    changed: watch::Sender<u64>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, event: &NetworkEvent) {
        let resolved = {
            let mut state = self.lock();
            match event {
                NetworkEvent::Request {
                    request_id,
                    method,
                    url,
                    at,
                } => {
                    let matched: Vec<PendingIntercept> = state
                        .rules
                        .values()
                        .filter(|active| *at >= active.registered_at)
                        .filter(|active| active.rule.matches(*method, url))
                        .map(|active| PendingIntercept {
                            alias: active.rule.alias.clone(),
                            generation: active.generation,
                            method: *method,
                            url: url.clone(),
                            requested_at: *at,
                        })
                        .collect();
                    let early = state.take_early(request_id);
                    for p in &matched {
                        tracing::debug!(alias = %p.alias, method = %method, url = %url, "intercepted request");
                    }
                    match early {
                        Some(response) if !matched.is_empty() => {
                            state.complete(request_id, matched, response.status, response.at)
                        }
                        _ => {
                            if !matched.is_empty() {
                                state
                                    .pending
                                    .entry(request_id.clone())
                                    .or_default()
                                    .extend(matched);
                            }
                            false
                        }
                    }
                }
                NetworkEvent::Response {
                    request_id,
                    status,
                    at,
                    ..
                } => match state.pending.remove(request_id) {
                    Some(pending) => state.complete(request_id, pending, *status, *at),
                    None => {
                        state.hold_early(
                            request_id,
                            EarlyResponse {
                                status: *status,
                                at: *at,
                            },
                        );
                        false
                    }
                },
            }
        };
        if resolved {
            self.changed.send_modify(|n| *n = n.wrapping_add(1));
        }
    }
}

/// Per-scenario registry of aliased intercept rules
#[derive(Debug)]
pub struct InterceptRegistry {
    shared: Arc<Shared>,
    pump: Option<JoinHandle<()>>,
    default_timeout: Duration,
}

impl InterceptRegistry {
    /// Registry fed manually through [`InterceptRegistry::observe`]
    #[must_use]
    pub fn detached(default_timeout: Duration) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState::default()),
                changed,
            }),
            pump: None,
            default_timeout,
        }
    }

    /// Registry fed from a driver's network stream
    #[must_use]
    pub fn attach(driver: &dyn Driver, default_timeout: Duration) -> Self {
        let mut registry = Self::detached(default_timeout);
        let mut events = driver.subscribe_network();
        let shared = Arc::clone(&registry.shared);
        registry.pump = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => shared.observe(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "intercept pump lagged behind network events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        registry
    }

    /// Register a rule; an existing rule with the same alias is replaced and
    /// its pending and unconsumed calls are discarded
    pub fn register(&self, rule: InterceptRule) {
        let mut state = self.shared.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        let alias = rule.alias.clone();
        let _ = state.completed.remove(&alias);
        for pending in state.pending.values_mut() {
            pending.retain(|p| p.alias != alias);
        }
        state.pending.retain(|_, v| !v.is_empty());
        tracing::debug!(alias = %alias, method = %rule.method, pattern = %rule.pattern, "registered intercept");
        let _ = state.rules.insert(
            alias,
            ActiveRule {
                rule,
                registered_at: Instant::now(),
                generation,
            },
        );
    }

    /// Register several rules
    pub fn register_all(&self, rules: impl IntoIterator<Item = InterceptRule>) {
        for rule in rules {
            self.register(rule);
        }
    }

    /// Feed one network event
    pub fn observe(&self, event: &NetworkEvent) {
        self.shared.observe(event);
    }

    /// Await the next completed call for `alias` with the default timeout
    pub async fn wait_for(&self, alias: &str) -> HarnessResult<InterceptedCall> {
        self.wait_inner(alias, None, self.default_timeout).await
    }

    /// Await the next completed call for `alias`
    pub async fn wait_for_within(
        &self,
        alias: &str,
        timeout: Duration,
    ) -> HarnessResult<InterceptedCall> {
        self.wait_inner(alias, None, timeout).await
    }

    /// Await a call for `alias` whose request left at or after `since`;
    /// older unconsumed calls are discarded
    pub async fn wait_for_after(
        &self,
        alias: &str,
        since: Instant,
    ) -> HarnessResult<InterceptedCall> {
        self.wait_inner(alias, Some(since), self.default_timeout)
            .await
    }

    async fn wait_inner(
        &self,
        alias: &str,
        since: Option<Instant>,
        timeout: Duration,
    ) -> HarnessResult<InterceptedCall> {
        let timeout_ms = timeout.as_millis() as u64;
        let deadline = tokio::time::Instant::now() + timeout;
        let mut changes = self.shared.changed.subscribe();
        loop {
            {
                let mut state = self.shared.lock();
                if !state.rules.contains_key(alias) {
                    state.unresolved = Some(alias.to_string());
                    tracing::warn!(alias, "awaited alias has no registered rule");
                    return Err(HarnessError::InterceptTimeout {
                        alias: alias.to_string(),
                        timeout_ms,
                        registered: false,
                    });
                }
                if let Some(queue) = state.completed.get_mut(alias) {
                    if let Some(since) = since {
                        while queue.front().is_some_and(|c| c.requested_at < since) {
                            if let Some(stale) = queue.pop_front() {
                                tracing::debug!(alias, url = %stale.url, "discarded call issued before the awaited action");
                            }
                        }
                    }
                    if let Some(call) = queue.pop_front() {
                        if state.unresolved.as_deref() == Some(alias) {
                            state.unresolved = None;
                        }
                        return Ok(call);
                    }
                }
            }
            match tokio::time::timeout_at(deadline, changes.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) | Err(_) => {
                    self.shared.lock().unresolved = Some(alias.to_string());
                    tracing::warn!(alias, timeout_ms, "intercept await timed out");
                    return Err(HarnessError::InterceptTimeout {
                        alias: alias.to_string(),
                        timeout_ms,
                        registered: true,
                    });
                }
            }
        }
    }

    /// Whether a rule is registered under `alias`
    #[must_use]
    pub fn is_registered(&self, alias: &str) -> bool {
        self.shared.lock().rules.contains_key(alias)
    }

    /// Registered aliases, sorted
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.shared.lock().rules.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Aliases with a request in flight, sorted
    #[must_use]
    pub fn pending_aliases(&self) -> Vec<String> {
        let state = self.shared.lock();
        let mut aliases: Vec<String> = state
            .pending
            .values()
            .flatten()
            .map(|p| p.alias.clone())
            .collect();
        aliases.sort();
        aliases.dedup();
        aliases
    }

    /// Completed calls not yet consumed by an await
    #[must_use]
    pub fn unconsumed(&self, alias: &str) -> usize {
        self.shared
            .lock()
            .completed
            .get(alias)
            .map_or(0, VecDeque::len)
    }

    /// Alias of the last await that failed and has not since resolved
    #[must_use]
    pub fn unresolved_alias(&self) -> Option<String> {
        self.shared.lock().unresolved.clone()
    }

    /// Discard every rule and intercept, resolved or not
    pub fn teardown(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        let mut state = self.shared.lock();
        state.rules.clear();
        state.pending.clear();
        state.completed.clear();
        state.early.clear();
        state.early_order.clear();
    }
}

impl Drop for InterceptRegistry {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
