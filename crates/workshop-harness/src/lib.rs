//! Workshop Harness: browser-driven acceptance tests for workshop job and
//! inventory workflows
//!
//! The harness drives the application through its rendered UI and correlates
//! each side-effecting action with the backend call it triggers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Scenario (one browsing context)                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ Workflow   │───►│ Page       │───►│ Selector Catalog   │    │
//! │   │ (Flow<S>)  │    │ Objects    │    │ + Wait Strategy    │    │
//! │   └─────┬──────┘    └─────┬──────┘    └────────────────────┘    │
//! │         │ await alias     │ query / click / type                │
//! │   ┌─────▼──────┐    ┌─────▼──────┐                              │
//! │   │ Intercept  │◄───│ Driver     │  Mock or Chromium (CDP)      │
//! │   │ Registry   │ net│            │                              │
//! │   └────────────┘    └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//!          ▲ one login per identity, shared across scenarios
//!   ┌──────┴───────┐
//!   │ SessionCache │
//!   └──────────────┘
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Capability traits composed into page objects
pub mod capability;
/// Versioned selector catalogs for the workshop screens
pub mod catalog;
/// Run configuration
pub mod config;
/// Browser seam and the scripted mock driver
pub mod driver;
/// Workshop endpoints and intercept rule sets
pub mod endpoints;
/// Aliased network intercepts
pub mod intercept;
/// Tracing subscriber installation
pub mod logging;
/// Screens of the application
pub mod pages;
/// Fixed-point quantities
pub mod quantity;
/// Run-level retry and reports
pub mod runner;
/// Element lookup
pub mod selector;
/// Authenticated session cache
pub mod session;
/// Action trace and failure diagnostics
pub mod trace;
/// Wait conditions and polling
pub mod wait;
/// Orchestrated business flows
pub mod workflow;

mod data;
mod result;

/// Chromium backend (requires the `browser` feature)
#[cfg(feature = "browser")]
pub mod chromium;

pub use capability::{Clickable, FillMode, Fillable, Navigable, Readable, Surface, Waitable};
pub use config::{Credentials, RunConfig, Timeouts, Viewport};
pub use data::TestData;
pub use driver::{Driver, DriverFactory, ElementHandle, MockDriver, MockElement, NetworkEvent};
pub use intercept::{HttpMethod, InterceptRegistry, InterceptRule, InterceptedCall, UrlGlob};
pub use logging::{init_tracing, LogFormat};
pub use pages::PageObject;
pub use quantity::Quantity;
pub use result::{ErrorKind, HarnessError, HarnessResult};
pub use runner::{AttemptReport, ScenarioReport, ScenarioRunner};
pub use selector::{Pick, Scope, Selector, SelectorCatalog, TextMatch};
pub use session::{Authenticator, Identity, Session, SessionCache, StorageState, UiAuthenticator};
pub use trace::{ActionTrace, Diagnostics, TraceEntry};
pub use wait::{WaitCondition, WaitSpec, Waiter};
pub use workflow::{Flow, FlowFailure, FlowState, Scenario, ScenarioContext};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumDriver, ChromiumFactory};
