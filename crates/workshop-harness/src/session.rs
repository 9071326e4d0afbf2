//! Authenticated session cache.
//!
//! ```text
//!  get_or_create(creds)
//!        │
//!        ▼
//!  ┌──────────────┐  valid + probe ok   ┌──────────────┐
//!  │ read cached  │────────────────────▶│ reuse Arc    │
//!  └──────┬───────┘                     └──────────────┘
//!         │ missing / invalid / probe failed
//!         ▼
//!  ┌──────────────┐  created meanwhile  ┌──────────────┐
//!  │ per-identity │────────────────────▶│ reuse fresh  │
//!  │ creation lock│                     └──────────────┘
//!  └──────┬───────┘
//!         │ still stale
//!         ▼
//!  ┌──────────────┐
//!  │ login once   │──▶ store, return
//!  └──────────────┘
//! ```
//!
//! Concurrent callers for one identity collapse into a single login; reads
//! of a valid session never serialize. Identities never share a slot.

use crate::capability::Surface;
use crate::catalog;
use crate::config::{Credentials, RunConfig};
use crate::driver::DriverFactory;
use crate::pages::{LoginPage, PageObject};
use crate::result::{HarnessError, HarnessResult};
use crate::trace::ActionTrace;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use uuid::Uuid;

// =============================================================================
// STORAGE STATE
// =============================================================================

/// Cookie same-site policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Strict
    Strict,
    /// Lax
    #[default]
    Lax,
    /// None
    None,
}

/// One browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain
    pub domain: String,
    /// Path
    pub path: String,
    /// Expiration timestamp (seconds since epoch)
    pub expires: Option<i64>,
    /// HTTP only flag
    pub http_only: bool,
    /// Secure flag
    pub secure: bool,
    /// Same site setting
    pub same_site: SameSite,
}

impl Cookie {
    /// Session cookie on `/`
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    /// Set HTTP only
    #[must_use]
    pub const fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Set secure
    #[must_use]
    pub const fn secure(mut self) -> Self {
        self.secure = true;
        self
    }
}

/// Cookies and web storage of an authenticated context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageState {
    /// Cookies
    pub cookies: Vec<Cookie>,
    /// Local storage by origin
    pub local_storage: HashMap<String, HashMap<String, String>>,
    /// Session storage by origin
    pub session_storage: HashMap<String, HashMap<String, String>>,
}

impl StorageState {
    /// Add a cookie
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Add a local storage item
    #[must_use]
    pub fn with_local_storage(mut self, origin: &str, key: &str, value: &str) -> Self {
        let _ = self
            .local_storage
            .entry(origin.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty() && self.session_storage.is_empty()
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Credential fingerprint; the password never leaves this hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// SHA-256 of username and password
    #[must_use]
    pub fn of(credentials: &Credentials) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(credentials.username.as_bytes());
        hasher.update([0u8]);
        hasher.update(credentials.password.as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Full hex fingerprint
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id:{}", &self.0[..12.min(self.0.len())])
    }
}

/// An authenticated browsing state shared read-only across scenarios
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    identity: Identity,
    storage: StorageState,
    created_at: DateTime<Utc>,
    valid: AtomicBool,
}

impl Session {
    /// Wrap a freshly captured storage state
    #[must_use]
    pub fn new(identity: Identity, storage: StorageState) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            storage,
            created_at: Utc::now(),
            valid: AtomicBool::new(true),
        }
    }

    /// Session id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Owning identity
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Captured cookies and storage
    #[must_use]
    pub const fn storage(&self) -> &StorageState {
        &self.storage
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Not invalidated yet
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark unusable; the next request recreates it
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

// =============================================================================
// AUTHENTICATOR
// =============================================================================

/// Performs the login sequence and the validation probe
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Log in and capture the authenticated storage state
    async fn login(&self, credentials: &Credentials) -> HarnessResult<StorageState>;

    /// Whether the session still reaches a protected route
    async fn probe(&self, session: &Session) -> HarnessResult<bool>;
}

/// Logs in through the login form in a fresh browsing context
pub struct UiAuthenticator {
    factory: Arc<dyn DriverFactory>,
    config: Arc<RunConfig>,
}

impl std::fmt::Debug for UiAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiAuthenticator")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl UiAuthenticator {
    /// Create an authenticator
    #[must_use]
    pub fn new(factory: Arc<dyn DriverFactory>, config: Arc<RunConfig>) -> Self {
        Self { factory, config }
    }

    async fn login_page(&self) -> HarnessResult<LoginPage> {
        let driver = self.factory.open().await?;
        let surface = Surface::new(
            driver,
            catalog::login_v1(),
            Arc::clone(&self.config),
            ActionTrace::new(self.config.trace_capacity),
        );
        Ok(LoginPage::new(&surface))
    }

    async fn log_in(page: &LoginPage, credentials: &Credentials) -> HarnessResult<StorageState> {
        page.open().await?;
        page.submit_credentials(credentials).await?;
        let url = page.wait_for_authenticated_shell().await?;
        tracing::info!(url = %url, "logged in");
        page.surface().driver().storage_state().await
    }

    async fn probe_with(page: &LoginPage, session: &Session) -> HarnessResult<bool> {
        page.surface()
            .driver()
            .apply_storage_state(session.storage())
            .await?;
        page.probe_authenticated().await
    }

    /// The login and probe contexts live only for one call
    async fn dispose(page: &LoginPage) {
        if let Err(e) = page.surface().driver().close().await {
            tracing::warn!(error = %e, "closing authentication context failed");
        }
    }
}

#[async_trait]
impl Authenticator for UiAuthenticator {
    async fn login(&self, credentials: &Credentials) -> HarnessResult<StorageState> {
        let page = self.login_page().await?;
        let outcome = Self::log_in(&page, credentials).await;
        Self::dispose(&page).await;
        outcome
    }

    async fn probe(&self, session: &Session) -> HarnessResult<bool> {
        let page = self.login_page().await?;
        let outcome = Self::probe_with(&page, session).await;
        Self::dispose(&page).await;
        outcome
    }
}

// =============================================================================
// CACHE
// =============================================================================

#[derive(Debug, Default)]
struct Slot {
    current: RwLock<Option<Arc<Session>>>,
    creating: tokio::sync::Mutex<()>,
}

/// Process-wide cache of one session per identity
#[derive(Debug)]
pub struct SessionCache<A> {
    authenticator: A,
    slots: Mutex<HashMap<Identity, Arc<Slot>>>,
    logins: AtomicUsize,
}

impl<A: Authenticator> SessionCache<A> {
    /// Create an empty cache
    #[must_use]
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator,
            slots: Mutex::new(HashMap::new()),
            logins: AtomicUsize::new(0),
        }
    }

    fn slot(&self, identity: &Identity) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(identity.clone()).or_default())
    }

    /// Cached session if valid and still accepted by the app, else a new
    /// one; a failed probe triggers exactly one recreation
    pub async fn get_or_create(&self, credentials: &Credentials) -> HarnessResult<Arc<Session>> {
        let identity = Identity::of(credentials);
        let slot = self.slot(&identity);

        let seen = slot.current.read().await.clone();
        if let Some(session) = &seen {
            if session.is_valid() {
                if self.revalidate(session).await {
                    tracing::debug!(identity = %identity, session = %session.id(), "reusing session");
                    return Ok(Arc::clone(session));
                }
                session.invalidate();
            }
        }

        let _creating = slot.creating.lock().await;
        if let Some(current) = slot.current.read().await.as_ref() {
            let created_meanwhile = seen.as_ref().map_or(true, |s| !Arc::ptr_eq(s, current));
            if current.is_valid() && created_meanwhile {
                return Ok(Arc::clone(current));
            }
        }

        let _ = self.logins.fetch_add(1, Ordering::SeqCst);
        tracing::info!(identity = %identity, "logging in");
        let storage = self
            .authenticator
            .login(credentials)
            .await
            .map_err(|e| HarnessError::SessionInvalid {
                identity: identity.to_string(),
                message: e.to_string(),
            })?;
        let session = Arc::new(Session::new(identity.clone(), storage));
        *slot.current.write().await = Some(Arc::clone(&session));
        tracing::info!(identity = %identity, session = %session.id(), "session created");
        Ok(session)
    }

    async fn revalidate(&self, session: &Session) -> bool {
        match self.authenticator.probe(session).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(identity = %session.identity(), "session probe redirected to login");
                false
            }
            Err(e) => {
                tracing::warn!(identity = %session.identity(), error = %e, "session probe failed");
                false
            }
        }
    }

    /// Drop the cached session for these credentials
    pub async fn invalidate(&self, credentials: &Credentials) {
        self.invalidate_identity(&Identity::of(credentials)).await;
    }

    /// Drop the cached session for an identity
    pub async fn invalidate_identity(&self, identity: &Identity) {
        let slot = self.slot(identity);
        let taken = slot.current.write().await.take();
        if let Some(session) = taken {
            session.invalidate();
            tracing::info!(identity = %identity, session = %session.id(), "session invalidated");
        }
    }

    /// Cached session without probing or creating
    pub async fn cached(&self, credentials: &Credentials) -> Option<Arc<Session>> {
        self.slot(&Identity::of(credentials))
            .current
            .read()
            .await
            .clone()
    }

    /// Login sequences performed so far
    #[must_use]
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}
