//! Action trace and failure diagnostics.
//!
//! Each page-object action records a [`TraceEntry`] in a bounded ring and
//! emits a `tracing` event. When a flow fails, the ring's tail is bundled
//! with the screenshot and intercept state into [`Diagnostics`] for the
//! reporting side.

use crate::result::{ErrorKind, HarnessResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Result of one traced action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Action completed
    Ok,
    /// Action failed with this kind
    Failed(ErrorKind),
}

/// One page-object action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Screen the action ran on
    pub screen: String,
    /// Selector role acted on
    pub role: String,
    /// Action name, e.g. `click` or `wait:absent`
    pub action: String,
    /// When the action finished
    pub at: DateTime<Utc>,
    /// Outcome
    pub outcome: TraceOutcome,
}

/// Bounded, shareable ring of recent actions
#[derive(Debug, Clone)]
pub struct ActionTrace {
    entries: Arc<Mutex<VecDeque<TraceEntry>>>,
    capacity: usize,
}

impl ActionTrace {
    /// Create a ring holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    /// Record an action
    pub fn record(&self, screen: &str, role: &str, action: &str, outcome: TraceOutcome) {
        match &outcome {
            TraceOutcome::Ok => tracing::debug!(screen, role, action, "action"),
            TraceOutcome::Failed(kind) => {
                tracing::debug!(screen, role, action, kind = %kind, "action failed");
            }
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            let _ = entries.pop_front();
        }
        entries.push_back(TraceEntry {
            screen: screen.to_string(),
            role: role.to_string(),
            action: action.to_string(),
            at: Utc::now(),
            outcome,
        });
    }

    /// Record the outcome of a fallible action and pass the result through
    pub fn observe<T>(
        &self,
        screen: &str,
        role: &str,
        action: &str,
        result: HarnessResult<T>,
    ) -> HarnessResult<T> {
        let outcome = match &result {
            Ok(_) => TraceOutcome::Ok,
            Err(e) => TraceOutcome::Failed(e.kind()),
        };
        self.record(screen, role, action, outcome);
        result
    }

    /// Most recent `n` entries, oldest first
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<TraceEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of entries held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the ring is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the reporting side needs to explain a failed flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Scenario instance
    pub scenario_id: Uuid,
    /// Flow name
    pub flow: String,
    /// Furthest state the flow reached
    pub furthest_state: String,
    /// Operation that failed
    pub operation: String,
    /// Kind of the originating error
    pub error_kind: ErrorKind,
    /// Error message
    pub message: String,
    /// Page URL at failure time
    pub url: Option<String>,
    /// Alias of the last failed intercept await
    pub unresolved_alias: Option<String>,
    /// Aliases with requests still in flight
    pub pending_aliases: Vec<String>,
    /// Recent actions, oldest first
    pub trace: Vec<TraceEntry>,
    /// When the diagnostics were captured
    pub captured_at: DateTime<Utc>,
    /// Size of the captured screenshot
    pub screenshot_bytes: usize,
    /// PNG screenshot, written next to the JSON report
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
}

impl Diagnostics {
    /// Write `<dir>/<scenario_id>.json` and, when captured,
    /// `<dir>/<scenario_id>.png`; returns the JSON path
    pub fn save(&self, dir: &Path) -> HarnessResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let json_path = dir.join(format!("{}.json", self.scenario_id));
        fs::write(&json_path, serde_json::to_string_pretty(self)?)?;
        if let Some(png) = &self.screenshot {
            fs::write(dir.join(format!("{}.png", self.scenario_id)), png)?;
        }
        Ok(json_path)
    }

    /// Load a saved JSON report (without the screenshot)
    pub fn load_json(path: &Path) -> HarnessResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
