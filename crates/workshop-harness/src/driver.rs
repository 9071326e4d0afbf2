//! Driver - Abstract Browser Seam
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Driver (async trait, Send + Sync)                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ChromiumDriver          │   │  MockDriver                 │  │
//! │  │  (feature = "browser")   │   │  scripted DOM + network     │  │
//! │  │  CDP via chromiumoxide   │   │  for tests                  │  │
//! │  └──────────────────────────┘   └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Elements cross the seam as [`ElementHandle`] snapshots. Every poll of a
//! wait re-queries, so a snapshot is never trusted past the action it was
//! taken for. Network traffic crosses the seam as a broadcast stream of
//! [`NetworkEvent`]s which the intercept registry consumes.

use crate::intercept::HttpMethod;
use crate::result::{HarnessError, HarnessResult};
use crate::session::{Cookie, StorageState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Capacity of the per-driver network event channel
pub const NETWORK_CHANNEL_CAPACITY: usize = 1024;

/// PNG signature returned by the mock when no screenshot is scripted
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

// =============================================================================
// ELEMENT HANDLE
// =============================================================================

/// Snapshot of one DOM element at query time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier
    pub id: String,
    /// Element tag name
    pub tag_name: String,
    /// Rendered text, descendants included
    pub text: String,
    /// Current form value for inputs
    pub value: Option<String>,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Rendered and not hidden by an ancestor
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
}

impl ElementHandle {
    /// Create a visible, enabled handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text: String::new(),
            value: None,
            attributes: BTreeMap::new(),
            visible: true,
            enabled: true,
        }
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Text with surrounding whitespace removed
    #[must_use]
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

// =============================================================================
// NETWORK EVENTS
// =============================================================================

/// Network traffic observed by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A request left the page
    Request {
        /// Correlates the request with its response
        request_id: String,
        /// HTTP method
        method: HttpMethod,
        /// Full request URL
        url: String,
        /// When the driver saw it
        at: Instant,
    },
    /// A response arrived
    Response {
        /// Correlates the response with its request
        request_id: String,
        /// HTTP status
        status: u16,
        /// Full response URL
        url: String,
        /// When the driver saw it
        at: Instant,
    },
}

impl NetworkEvent {
    /// Request identifier
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::Request { request_id, .. } | Self::Response { request_id, .. } => request_id,
        }
    }

    /// Observation time
    #[must_use]
    pub const fn at(&self) -> Instant {
        match self {
            Self::Request { at, .. } | Self::Response { at, .. } => *at,
        }
    }
}

// =============================================================================
// DRIVER TRAIT
// =============================================================================

/// Abstract driver for one browsing context
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Current page URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// All elements matching `css`, in document order, optionally restricted
    /// to descendants of `within`
    async fn query_all(
        &self,
        css: &str,
        within: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> HarnessResult<()>;

    /// Clear an input
    async fn clear(&self, element: &ElementHandle) -> HarnessResult<()>;

    /// Type into an input at the end of its current value
    async fn type_text(&self, element: &ElementHandle, text: &str) -> HarnessResult<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// Cookies and storage of the context
    async fn storage_state(&self) -> HarnessResult<StorageState>;

    /// Restore cookies and storage into the context
    async fn apply_storage_state(&self, state: &StorageState) -> HarnessResult<()>;

    /// Subscribe to network traffic from now on
    fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent>;

    /// Dispose of the browsing context; closing twice is a no-op
    async fn close(&self) -> HarnessResult<()>;
}

/// Opens one fresh browsing context per call
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Open a new context
    async fn open(&self) -> HarnessResult<Arc<dyn Driver>>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Reaction run when a scripted element is clicked or a path is visited
pub type MockReaction = Arc<dyn Fn(&mut MockEffects<'_>) + Send + Sync>;

type LaterFn = Box<dyn FnOnce(&mut MockEffects<'_>) + Send>;

/// One element of the scripted DOM
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Unique id
    pub id: String,
    /// Tag name
    pub tag_name: String,
    /// CSS expressions this element answers to
    pub selectors: Vec<String>,
    /// Enclosing element
    pub parent: Option<String>,
    /// Own text
    pub text: String,
    /// Form value
    pub value: Option<String>,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Own visibility
    pub visible: bool,
    /// Enabled state
    pub enabled: bool,
}

impl MockElement {
    /// Create a visible element
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            selectors: Vec::new(),
            parent: None,
            text: String::new(),
            value: None,
            attributes: BTreeMap::new(),
            visible: true,
            enabled: true,
        }
    }

    /// Answer to a CSS expression
    #[must_use]
    pub fn matching(mut self, css: impl Into<String>) -> Self {
        self.selectors.push(css.into());
        self
    }

    /// Nest under another element
    #[must_use]
    pub fn within(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set own text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Render hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Render disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Scripted document, cookies and reactions behind a [`MockDriver`]
#[derive(Default)]
pub struct MockDom {
    url: String,
    elements: Vec<MockElement>,
    cookies: Vec<Cookie>,
    click_reactions: HashMap<String, MockReaction>,
    navigate_reactions: Vec<(String, MockReaction)>,
}

impl std::fmt::Debug for MockDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDom")
            .field("url", &self.url)
            .field("elements", &self.elements.len())
            .field("cookies", &self.cookies.len())
            .field("click_reactions", &self.click_reactions.len())
            .field("navigate_reactions", &self.navigate_reactions.len())
            .finish()
    }
}

impl MockDom {
    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the current URL (client-side routing or redirects)
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Insert an element, replacing any element with the same id
    pub fn insert(&mut self, element: MockElement) {
        if let Some(existing) = self.elements.iter_mut().find(|e| e.id == element.id) {
            *existing = element;
        } else {
            self.elements.push(element);
        }
    }

    /// Remove an element and everything nested in it
    pub fn remove(&mut self, id: &str) {
        let doomed: Vec<String> = self
            .elements
            .iter()
            .filter(|e| e.id == id || self.is_descendant(&e.id, id))
            .map(|e| e.id.clone())
            .collect();
        self.elements.retain(|e| !doomed.contains(&e.id));
        for gone in &doomed {
            let _ = self.click_reactions.remove(gone);
        }
    }

    /// Whether an element exists
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.elements.iter().any(|e| e.id == id)
    }

    /// Element by id
    #[must_use]
    pub fn element(&self, id: &str) -> Option<&MockElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Mutable element by id
    pub fn element_mut(&mut self, id: &str) -> Option<&mut MockElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Form value of an element
    #[must_use]
    pub fn value(&self, id: &str) -> Option<String> {
        self.element(id).and_then(|e| e.value.clone())
    }

    /// Set own text of an element
    pub fn set_text(&mut self, id: &str, text: impl Into<String>) {
        if let Some(e) = self.element_mut(id) {
            e.text = text.into();
        }
    }

    /// Show or hide an element
    pub fn set_visible(&mut self, id: &str, visible: bool) {
        if let Some(e) = self.element_mut(id) {
            e.visible = visible;
        }
    }

    /// Run `reaction` whenever the element is clicked
    pub fn on_click<F>(&mut self, id: impl Into<String>, reaction: F)
    where
        F: Fn(&mut MockEffects<'_>) + Send + Sync + 'static,
    {
        let _ = self.click_reactions.insert(id.into(), Arc::new(reaction));
    }

    /// Run `reaction` whenever a URL whose path contains `path` is visited
    pub fn on_navigate<F>(&mut self, path: impl Into<String>, reaction: F)
    where
        F: Fn(&mut MockEffects<'_>) + Send + Sync + 'static,
    {
        self.navigate_reactions.push((path.into(), Arc::new(reaction)));
    }

    /// Cookies of the context
    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Add a cookie, replacing one with the same name
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| c.name != cookie.name);
        self.cookies.push(cookie);
    }

    fn is_descendant(&self, id: &str, ancestor: &str) -> bool {
        let mut current = self.element(id).and_then(|e| e.parent.clone());
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.element(&parent).and_then(|e| e.parent.clone());
        }
        false
    }

    fn effectively_visible(&self, element: &MockElement) -> bool {
        if !element.visible {
            return false;
        }
        match element.parent.as_deref().and_then(|p| self.element(p)) {
            Some(parent) => self.effectively_visible(parent),
            None => true,
        }
    }

    fn deep_text(&self, id: &str) -> String {
        let mut parts = Vec::new();
        if let Some(own) = self.element(id).map(|e| e.text.trim()) {
            if !own.is_empty() {
                parts.push(own.to_string());
            }
        }
        for child in self.elements.iter().filter(|e| e.parent.as_deref() == Some(id)) {
            let text = self.deep_text(&child.id);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    fn snapshot(&self, element: &MockElement) -> ElementHandle {
        ElementHandle {
            id: element.id.clone(),
            tag_name: element.tag_name.clone(),
            text: self.deep_text(&element.id),
            value: element.value.clone(),
            attributes: element.attributes.clone(),
            visible: self.effectively_visible(element),
            enabled: element.enabled,
        }
    }

    /// Elements answering to `css`, optionally nested in `within`
    #[must_use]
    pub fn query(&self, css: &str, within: Option<&str>) -> Vec<ElementHandle> {
        self.elements
            .iter()
            .filter(|e| e.selectors.iter().any(|s| s == css))
            .filter(|e| within.map_or(true, |w| self.is_descendant(&e.id, w)))
            .map(|e| self.snapshot(e))
            .collect()
    }
}

enum Scheduled {
    Call {
        method: HttpMethod,
        url: String,
        status: u16,
        delay: Duration,
    },
    Later {
        delay: Duration,
        reaction: LaterFn,
    },
}

/// Side effects available to a reaction
pub struct MockEffects<'a> {
    /// The scripted document
    pub dom: &'a mut MockDom,
    scheduled: Vec<Scheduled>,
}

impl std::fmt::Debug for MockEffects<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEffects")
            .field("dom", &self.dom)
            .field("scheduled", &self.scheduled.len())
            .finish()
    }
}

impl MockEffects<'_> {
    /// Issue a request that completes immediately
    pub fn call(&mut self, method: HttpMethod, url: impl Into<String>, status: u16) {
        self.call_delayed(method, url, status, Duration::ZERO);
    }

    /// Issue a request now whose response arrives after `delay`
    pub fn call_delayed(
        &mut self,
        method: HttpMethod,
        url: impl Into<String>,
        status: u16,
        delay: Duration,
    ) {
        self.scheduled.push(Scheduled::Call {
            method,
            url: url.into(),
            status,
            delay,
        });
    }

    /// Run more effects after `delay`
    pub fn later<F>(&mut self, delay: Duration, reaction: F)
    where
        F: FnOnce(&mut MockEffects<'_>) + Send + 'static,
    {
        self.scheduled.push(Scheduled::Later {
            delay,
            reaction: Box::new(reaction),
        });
    }
}

#[derive(Debug)]
struct MockInner {
    dom: Mutex<MockDom>,
    events: broadcast::Sender<NetworkEvent>,
    history: Mutex<Vec<String>>,
    screenshot: Mutex<Vec<u8>>,
    next_request: AtomicU64,
    closed: AtomicBool,
}

/// Scripted in-memory driver for tests
///
/// Clones share one document, so a test can keep a handle for assertions
/// while the harness drives another.
#[derive(Debug, Clone)]
pub struct MockDriver {
    inner: Arc<MockInner>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create an empty driver
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(NETWORK_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MockInner {
                dom: Mutex::new(MockDom::default()),
                events,
                history: Mutex::new(Vec::new()),
                screenshot: Mutex::new(PNG_MAGIC.to_vec()),
                next_request: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Inspect or script the document
    pub fn with_dom<R>(&self, f: impl FnOnce(&mut MockDom) -> R) -> R {
        let mut dom = self.inner.dom.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut dom)
    }

    /// Set screenshot bytes
    pub fn set_screenshot(&self, data: Vec<u8>) {
        *self
            .inner
            .screenshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = data;
    }

    /// Recorded calls, e.g. `click:save-button`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether [`Driver::close`] has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Check if a call with this prefix was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(prefix))
    }

    /// Emit a request event; returns its id
    pub fn emit_request(&self, method: HttpMethod, url: &str) -> String {
        Self::send_request(&self.inner, method, url)
    }

    /// Emit a response event for an earlier request
    pub fn emit_response(&self, request_id: &str, status: u16, url: &str) {
        Self::send_response(&self.inner, request_id, status, url);
    }

    /// Emit a complete request/response pair
    pub fn emit_call(&self, method: HttpMethod, url: &str, status: u16) {
        let id = self.emit_request(method, url);
        self.emit_response(&id, status, url);
    }

    fn record(&self, entry: String) {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn send_request(inner: &MockInner, method: HttpMethod, url: &str) -> String {
        let id = format!("mock-{}", inner.next_request.fetch_add(1, Ordering::SeqCst));
        let _ = inner.events.send(NetworkEvent::Request {
            request_id: id.clone(),
            method,
            url: url.to_string(),
            at: Instant::now(),
        });
        id
    }

    fn send_response(inner: &MockInner, request_id: &str, status: u16, url: &str) {
        let _ = inner.events.send(NetworkEvent::Response {
            request_id: request_id.to_string(),
            status,
            url: url.to_string(),
            at: Instant::now(),
        });
    }

    fn run(inner: &Arc<MockInner>, reaction: impl FnOnce(&mut MockEffects<'_>)) {
        let scheduled = {
            let mut dom = inner.dom.lock().unwrap_or_else(PoisonError::into_inner);
            let mut effects = MockEffects {
                dom: &mut dom,
                scheduled: Vec::new(),
            };
            reaction(&mut effects);
            effects.scheduled
        };
        Self::dispatch(inner, scheduled);
    }

    fn dispatch(inner: &Arc<MockInner>, scheduled: Vec<Scheduled>) {
        for item in scheduled {
            match item {
                Scheduled::Call {
                    method,
                    url,
                    status,
                    delay,
                } => {
                    let id = Self::send_request(inner, method, &url);
                    if delay.is_zero() {
                        Self::send_response(inner, &id, status, &url);
                    } else {
                        let inner = Arc::clone(inner);
                        let _ = tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            Self::send_response(&inner, &id, status, &url);
                        });
                    }
                }
                Scheduled::Later { delay, reaction } => {
                    let inner = Arc::clone(inner);
                    let _ = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        Self::run(&inner, reaction);
                    });
                }
            }
        }
    }

    fn interactable(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.with_dom(|dom| match dom.element(&element.id) {
            None => Err(HarnessError::driver(format!(
                "element `{}` is detached from the document",
                element.id
            ))),
            Some(e) if !dom.effectively_visible(e) => Err(HarnessError::driver(format!(
                "element `{}` is not visible",
                element.id
            ))),
            Some(e) if !e.enabled => Err(HarnessError::driver(format!(
                "element `{}` is disabled",
                element.id
            ))),
            Some(_) => Ok(()),
        })
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        self.record(format!("navigate:{url}"));
        let reactions: Vec<MockReaction> = self.with_dom(|dom| {
            dom.url = url.to_string();
            let path = url_path(url);
            dom.navigate_reactions
                .iter()
                .filter(|(fragment, _)| path.contains(fragment.as_str()))
                .map(|(_, r)| Arc::clone(r))
                .collect()
        });
        for reaction in reactions {
            Self::run(&self.inner, |fx| reaction(fx));
        }
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.with_dom(|dom| dom.url.clone()))
    }

    async fn query_all(
        &self,
        css: &str,
        within: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>> {
        Ok(self.with_dom(|dom| dom.query(css, within.map(|w| w.id.as_str()))))
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.interactable(element)?;
        self.record(format!("click:{}", element.id));
        let reaction = self.with_dom(|dom| dom.click_reactions.get(&element.id).cloned());
        if let Some(reaction) = reaction {
            Self::run(&self.inner, |fx| reaction(fx));
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.interactable(element)?;
        self.record(format!("clear:{}", element.id));
        self.with_dom(|dom| {
            if let Some(e) = dom.element_mut(&element.id) {
                e.value = Some(String::new());
            }
        });
        Ok(())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.interactable(element)?;
        self.record(format!("type:{}:{text}", element.id));
        self.with_dom(|dom| {
            if let Some(e) = dom.element_mut(&element.id) {
                let mut value = e.value.take().unwrap_or_default();
                value.push_str(text);
                e.value = Some(value);
            }
        });
        Ok(())
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        Ok(self
            .inner
            .screenshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn storage_state(&self) -> HarnessResult<StorageState> {
        let cookies = self.with_dom(|dom| dom.cookies.clone());
        Ok(StorageState {
            cookies,
            ..StorageState::default()
        })
    }

    async fn apply_storage_state(&self, state: &StorageState) -> HarnessResult<()> {
        self.record("apply_storage_state".to_string());
        self.with_dom(|dom| dom.cookies = state.cookies.clone());
        Ok(())
    }

    fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent> {
        self.inner.events.subscribe()
    }

    async fn close(&self) -> HarnessResult<()> {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            self.record("close".to_string());
        }
        Ok(())
    }
}

/// Path component of a URL, without scheme, host, query or fragment
#[must_use]
pub fn url_path(url: &str) -> &str {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    match without_query.find("://") {
        Some(scheme_end) => {
            let rest = &without_query[scheme_end + 3..];
            rest.find('/').map_or("/", |slash| &rest[slash..])
        }
        None => without_query,
    }
}
