//! Scenario plumbing: intercept registration per scenario and run-level
//! retry over full scenarios.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};
use support::Workshop;
use workshop_harness::endpoints::{self, alias};
use workshop_harness::pages::PartsListPage;
use workshop_harness::workflow::merge_first_two_parts;
use workshop_harness::{
    Driver, FlowFailure, HarnessError, PageObject, Scenario, ScenarioRunner,
};

// ============================================================================
// Intercept registry
// ============================================================================

#[tokio::test]
async fn test_unregistered_alias_fails_without_waiting() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);
    let scenario = Scenario::begin(
        &workshop,
        &sessions,
        Arc::clone(&config),
        endpoints::job_rules().unwrap(),
    )
    .await
    .unwrap();

    let start = Instant::now();
    let err = scenario.intercepts().wait_for(alias::MERGE_PARTS).await.unwrap_err();

    assert!(start.elapsed() < Duration::from_millis(500));
    assert!(matches!(
        err,
        HarnessError::InterceptTimeout { registered: false, .. }
    ));
    assert_eq!(
        scenario.intercepts().unresolved_alias().as_deref(),
        Some(alias::MERGE_PARTS)
    );
    assert!(scenario.intercepts().is_registered(alias::GET_JOB));
}

#[tokio::test]
async fn test_registered_alias_wait_is_bounded() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);
    let scenario = support::begin(&workshop, &sessions, &config).await;

    let start = Instant::now();
    let err = scenario
        .intercepts()
        .wait_for_within(alias::ADJUST_STOCK, Duration::from_millis(100))
        .await
        .unwrap_err();

    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(100));
    assert!(waited < Duration::from_millis(1_000), "waited {waited:?}");
    assert!(matches!(
        err,
        HarnessError::InterceptTimeout { registered: true, timeout_ms: 100, .. }
    ));
}

#[tokio::test]
async fn test_parts_list_load_resolves_its_alias() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);
    let scenario = support::begin(&workshop, &sessions, &config).await;
    let surface = scenario.surface();
    let list = PartsListPage::new(&surface);

    let requested = Instant::now();
    scenario
        .driver()
        .navigate(&config.url(list.url_pattern().unwrap()))
        .await
        .unwrap();
    let call = scenario
        .intercepts()
        .wait_for_after(alias::PARTS_LIST, requested)
        .await
        .unwrap();

    assert_eq!(call.status, 200);
    assert!(call.completed_at >= call.requested_at);
}

#[tokio::test]
async fn test_teardown_discards_every_rule() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);
    let mut scenario = support::begin(&workshop, &sessions, &config).await;
    assert!(!scenario.intercepts().aliases().is_empty());

    scenario.teardown().await;

    assert!(scenario.intercepts().aliases().is_empty());
    assert!(scenario.intercepts().pending_aliases().is_empty());
}

// ============================================================================
// Run-level retry
// ============================================================================

#[tokio::test]
async fn test_flaky_merge_passes_on_second_attempt() {
    let workshop = Workshop::new();
    workshop.backend(|b| b.merge_status = 503);
    let config = support::config(1_000);
    let sessions = support::sessions(&workshop, &config);
    let rules = endpoints::all_rules().unwrap();

    let w = &workshop;
    let s = &sessions;
    let c = &config;
    let r = &rules;
    let report = ScenarioRunner::new(1)
        .run("part_merge", move |n| async move {
            if n > 0 {
                w.backend(|b| b.merge_status = 200);
            }
            let scenario = Scenario::begin(w, s, Arc::clone(c), r.clone())
                .await
                .map_err(|e| FlowFailure::new("part_merge", "Idle", "begin", e))?;
            PartsListPage::new(&scenario.surface())
                .open()
                .await
                .map_err(|e| FlowFailure::new("part_merge", "Idle", "open_parts_list", e))?;
            merge_first_two_parts(&scenario).await.map(|_| ())
        })
        .await;

    assert!(report.passed);
    assert!(report.is_flaky());
    assert_eq!(report.attempt_count(), 2);
    let first = &report.attempts[0];
    assert_eq!(first.operation.as_deref(), Some("await_merged"));
    assert_eq!(first.furthest_state.as_deref(), Some("Confirmed"));
    assert_eq!(sessions.login_count(), 1);
    assert!(workshop.backend(|b| b.part_by_code("PART_B").is_none()));
}
