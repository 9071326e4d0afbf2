//! Session cache against the scripted login form.
//!
//! One login per identity, shared by every scenario, re-created only when
//! the application stops accepting it.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use std::sync::Arc;
use support::Workshop;
use workshop_harness::endpoints;
use workshop_harness::{Credentials, Driver, ErrorKind, RunConfig, Scenario};

// ============================================================================
// Single flight
// ============================================================================

#[tokio::test]
async fn test_concurrent_scenarios_share_one_login() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);
    let rules = endpoints::all_rules().unwrap();

    let begins = (0..4).map(|_| {
        Scenario::begin(&workshop, &sessions, Arc::clone(&config), rules.clone())
    });
    let scenarios: Vec<Scenario> = futures::future::join_all(begins)
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(sessions.login_count(), 1);
    assert_eq!(workshop.backend(|b| b.logins), 1);
    let first = scenarios[0].session().id();
    assert!(scenarios.iter().all(|s| s.session().id() == first));
}

#[tokio::test]
async fn test_storage_applied_before_first_navigation() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);
    let scenario = support::begin(&workshop, &sessions, &config).await;

    let context = workshop.contexts().remove(0);
    assert_eq!(context.history().first().map(String::as_str), Some("apply_storage_state"));

    scenario.driver().navigate(&config.url("/dashboard")).await.unwrap();
    let url = scenario.driver().current_url().await.unwrap();
    assert!(url.ends_with("/dashboard"), "redirected to {url}");
}

// ============================================================================
// Revalidation
// ============================================================================

#[tokio::test]
async fn test_live_session_reused_after_probe() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);

    let first = support::begin(&workshop, &sessions, &config).await;
    let second = support::begin(&workshop, &sessions, &config).await;

    assert_eq!(sessions.login_count(), 1);
    assert_eq!(first.session().id(), second.session().id());
    let probed = workshop
        .contexts()
        .iter()
        .any(|c| c.was_called("navigate:https://workshop.test/dashboard"));
    assert!(probed);
}

#[tokio::test]
async fn test_revoked_session_logs_in_once_more() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);

    let first = support::begin(&workshop, &sessions, &config).await;
    workshop.revoke_sessions();
    let second = support::begin(&workshop, &sessions, &config).await;

    assert_eq!(sessions.login_count(), 2);
    assert_ne!(first.session().id(), second.session().id());
    assert!(!first.session().is_valid());

    second.driver().navigate(&config.url("/job-management/jobs")).await.unwrap();
    let url = second.driver().current_url().await.unwrap();
    assert!(url.ends_with("/job-management/jobs"), "redirected to {url}");
}

#[tokio::test]
async fn test_authentication_contexts_are_closed() {
    let workshop = Workshop::new();
    let config = support::config(2_000);
    let sessions = support::sessions(&workshop, &config);

    let _first = support::begin(&workshop, &sessions, &config).await;
    let mut second = support::begin(&workshop, &sessions, &config).await;

    // scenario, login, scenario, probe
    let closed: Vec<bool> = workshop.contexts().iter().map(|c| c.is_closed()).collect();
    assert_eq!(closed, vec![false, true, false, true]);

    second.teardown().await;
    let contexts = workshop.contexts();
    assert!(contexts[2].is_closed());
    assert!(!contexts[0].is_closed());
}

#[tokio::test]
async fn test_rejected_credentials_are_session_invalid() {
    let workshop = Workshop::new();
    let config = Arc::new(
        RunConfig::clone(&support::config(300))
            .with_credentials(Credentials::new(support::USERNAME, "wrong")),
    );
    let sessions = support::sessions(&workshop, &config);

    let err = sessions.get_or_create(&config.credentials).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SessionInvalid);
    assert_eq!(workshop.backend(|b| b.logins), 0);
    assert!(sessions.cached(&config.credentials).await.is_none());
}
