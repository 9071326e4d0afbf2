//! Run configuration.
//!
//! A run is configured in three layers, later layers winning:
//!
//! 1. built-in defaults (the test environment and its timeouts)
//! 2. an optional YAML file
//! 3. `WORKSHOP_*` environment variables
//!
//! The configuration is consumed read-only: at session creation and at every
//! wait evaluation.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default application under test
pub const DEFAULT_BASE_URL: &str = "https://tst.workshop.auxosoftware.com";

/// Default number of whole-scenario retries
pub const DEFAULT_RETRIES: u32 = 2;

/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "WORKSHOP_BASE_URL";
/// Environment variable carrying the login name
pub const ENV_USERNAME: &str = "WORKSHOP_USERNAME";
/// Environment variable carrying the password
pub const ENV_PASSWORD: &str = "WORKSHOP_PASSWORD";
/// Environment variable overriding the retry count
pub const ENV_RETRIES: &str = "WORKSHOP_RETRIES";
/// Environment variable overriding headless mode
pub const ENV_HEADLESS: &str = "WORKSHOP_HEADLESS";

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Username/password pair used by the login sequence
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Whether both halves are present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Named timeouts, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Default DOM wait
    pub command_ms: u64,
    /// Intercept awaits
    pub intercept_ms: u64,
    /// Full page loads
    pub page_load_ms: u64,
    /// First login field on a cold start
    pub login_field_ms: u64,
    /// Redirect into the authenticated shell
    pub authenticated_url_ms: u64,
    /// Loading spinner to clear
    pub spinner_ms: u64,
    /// Part history panel to render
    pub history_ms: u64,
    /// Interval between DOM polls
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_ms: 15_000,
            intercept_ms: 15_000,
            page_load_ms: 60_000,
            login_field_ms: 20_000,
            authenticated_url_ms: 10_000,
            spinner_ms: 30_000,
            history_ms: 20_000,
            poll_interval_ms: 50,
        }
    }
}

impl Timeouts {
    /// Default DOM wait
    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_millis(self.command_ms)
    }

    /// Intercept await bound
    #[must_use]
    pub const fn intercept(&self) -> Duration {
        Duration::from_millis(self.intercept_ms)
    }

    /// Page load bound
    #[must_use]
    pub const fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    /// Login field bound
    #[must_use]
    pub const fn login_field(&self) -> Duration {
        Duration::from_millis(self.login_field_ms)
    }

    /// Authenticated redirect bound
    #[must_use]
    pub const fn authenticated_url(&self) -> Duration {
        Duration::from_millis(self.authenticated_url_ms)
    }

    /// Spinner bound
    #[must_use]
    pub const fn spinner(&self) -> Duration {
        Duration::from_millis(self.spinner_ms)
    }

    /// History panel bound
    #[must_use]
    pub const fn history(&self) -> Duration {
        Duration::from_millis(self.history_ms)
    }

    /// Poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Scale every bound down to `ms`, keeping the poll interval below it.
    /// Handy for fast local runs against a scripted application.
    #[must_use]
    pub fn uniform(ms: u64) -> Self {
        Self {
            command_ms: ms,
            intercept_ms: ms,
            page_load_ms: ms,
            login_field_ms: ms,
            authenticated_url_ms: ms,
            spinner_ms: ms,
            history_ms: ms,
            poll_interval_ms: (ms / 20).clamp(1, 50),
        }
    }
}

// =============================================================================
// VIEWPORT
// =============================================================================

/// Browser viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

// =============================================================================
// RUN CONFIG
// =============================================================================

/// Configuration for one harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Application base URL
    pub base_url: String,
    /// Login credentials
    pub credentials: Credentials,
    /// Named timeouts
    pub timeouts: Timeouts,
    /// Whole-scenario retries after the first attempt
    pub retries: u32,
    /// Viewport
    pub viewport: Viewport,
    /// Run the browser without a window
    pub headless: bool,
    /// Action trace entries kept for diagnostics
    pub trace_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::default(),
            timeouts: Timeouts::default(),
            retries: DEFAULT_RETRIES,
            viewport: Viewport::default(),
            headless: true,
            trace_capacity: 200,
        }
    }
}

impl RunConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set timeouts
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set retry count
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Parse a YAML document, filling gaps with defaults
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Defaults, then the optional file, then the process environment
    pub fn load(path: Option<&Path>) -> HarnessResult<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WORKSHOP_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(user) = lookup(ENV_USERNAME) {
            self.credentials.username = user;
        }
        if let Some(pass) = lookup(ENV_PASSWORD) {
            self.credentials.password = pass;
        }
        if let Some(raw) = lookup(ENV_RETRIES) {
            self.retries = raw.trim().parse().map_err(|_| HarnessError::Config {
                message: format!("{ENV_RETRIES} must be a non-negative integer, got `{raw}`"),
            })?;
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.headless = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(HarnessError::Config {
                        message: format!("{ENV_HEADLESS} must be a boolean, got `{raw}`"),
                    })
                }
            };
        }
        Ok(self)
    }

    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::Config {
                message: "base_url is empty".to_string(),
            });
        }
        if !self.credentials.is_complete() {
            return Err(HarnessError::Config {
                message: format!("credentials missing; set {ENV_USERNAME} and {ENV_PASSWORD}"),
            });
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(HarnessError::Config {
                message: "poll_interval_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Join a site-relative path onto the base URL
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
