//! Chromium backend over CDP.
//!
//! Each scenario gets its own browser context (separate cookies and storage)
//! in one shared Chromium process. Elements are located with a small script
//! that tags every match with a `data-harness-id` attribute, so later clicks
//! and typing address exactly the element that was snapshotted.
//!
//! Network events carry the CDP monotonic timestamp rather than the moment
//! the pump forwarded them; the request and response listeners are separate
//! streams, so their interleaving says nothing about wire order.

use crate::config::RunConfig;
use crate::driver::{Driver, DriverFactory, ElementHandle, NetworkEvent, NETWORK_CHANNEL_CAPACITY};
use crate::intercept::HttpMethod;
use crate::result::{HarnessError, HarnessResult};
use crate::session::{Cookie, SameSite, StorageState};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, CookieSameSite, EnableParams, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::target::{
    BrowserContextId, CloseTargetParams, CreateBrowserContextParams, CreateTargetParams,
    DisposeBrowserContextParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Attribute the query script stamps on matched elements
const HANDLE_ATTRIBUTE: &str = "data-harness-id";

/// Snapshot every element matching `css`, optionally under the element
/// tagged `within`
fn query_script(css: &str, within: Option<&str>) -> HarnessResult<String> {
    let css = serde_json::to_string(css)?;
    let within = serde_json::to_string(&within)?;
    Ok(format!(
        r#"(() => {{
  const within = {within};
  const root = within === null ? document : document.querySelector(`[{HANDLE_ATTRIBUTE}="${{within}}"]`);
  if (!root) return [];
  window.__harnessSeq = window.__harnessSeq || 0;
  return Array.from(root.querySelectorAll({css})).map((el) => {{
    if (!el.hasAttribute("{HANDLE_ATTRIBUTE}")) {{
      window.__harnessSeq += 1;
      el.setAttribute("{HANDLE_ATTRIBUTE}", "h" + window.__harnessSeq);
    }}
    const attributes = {{}};
    for (const a of el.attributes) attributes[a.name] = a.value;
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const isInput = el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement || el instanceof HTMLSelectElement;
    return {{
      id: el.getAttribute("{HANDLE_ATTRIBUTE}"),
      tag_name: el.tagName.toLowerCase(),
      text: (el.innerText ?? el.textContent ?? "").toString(),
      value: isInput ? String(el.value) : null,
      attributes,
      visible: rect.width > 0 && rect.height > 0 && style.visibility !== "hidden" && style.display !== "none",
      enabled: !el.disabled && el.getAttribute("aria-disabled") !== "true",
    }};
  }});
}})()"#
    ))
}

fn handle_selector(element: &ElementHandle) -> String {
    format!("[{HANDLE_ATTRIBUTE}=\"{}\"]", element.id)
}

/// Run `body` against the tagged element `el`
fn element_script(element: &ElementHandle, body: &str) -> HarnessResult<String> {
    let selector = serde_json::to_string(&handle_selector(element))?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({selector}); if (!el) return false; {body} return true; }})()"
    ))
}

/// Clear through the native setter so framework-controlled inputs notice
const CLEAR_BODY: &str = r#"
  const proto = Object.getPrototypeOf(el);
  const setter = Object.getOwnPropertyDescriptor(proto, "value").set;
  setter.call(el, "");
  el.dispatchEvent(new Event("input", { bubbles: true }));
  el.dispatchEvent(new Event("change", { bubbles: true }));"#;

/// Focus with the caret after the current value
const CARET_END_BODY: &str = r#"
  el.focus();
  if (typeof el.setSelectionRange === "function" && typeof el.value === "string") {
    el.setSelectionRange(el.value.length, el.value.length);
  }"#;

const STORAGE_SCRIPT: &str = r#"(() => ({
  origin: window.location.origin,
  local: Object.fromEntries(Object.entries(window.localStorage)),
  session: Object.fromEntries(Object.entries(window.sessionStorage)),
}))()"#;

#[derive(Debug, Deserialize)]
struct OriginStorage {
    origin: String,
    local: HashMap<String, String>,
    session: HashMap<String, String>,
}

fn to_same_site(value: Option<&CookieSameSite>) -> SameSite {
    match value {
        Some(CookieSameSite::Strict) => SameSite::Strict,
        Some(CookieSameSite::None) => SameSite::None,
        _ => SameSite::Lax,
    }
}

fn from_same_site(value: SameSite) -> CookieSameSite {
    match value {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    }
}

/// Maps CDP monotonic seconds onto [`Instant`], anchored at the first
/// event seen
#[derive(Debug, Default)]
struct CdpClock {
    anchor: OnceLock<(Instant, f64)>,
}

impl CdpClock {
    fn instant(&self, seconds: f64) -> Instant {
        let (base, origin) = *self.anchor.get_or_init(|| (Instant::now(), seconds));
        let offset = seconds - origin;
        let Ok(delta) = Duration::try_from_secs_f64(offset.abs()) else {
            return base;
        };
        if offset >= 0.0 {
            base + delta
        } else {
            base.checked_sub(delta).unwrap_or(base)
        }
    }
}

/// One CDP page in its own browser context
#[derive(Debug)]
pub struct ChromiumDriver {
    page: CdpPage,
    browser: Arc<Mutex<CdpBrowser>>,
    context: BrowserContextId,
    events: broadcast::Sender<NetworkEvent>,
    pump: JoinHandle<()>,
    closed: AtomicBool,
}

impl ChromiumDriver {
    async fn new(
        page: CdpPage,
        browser: Arc<Mutex<CdpBrowser>>,
        context: BrowserContextId,
    ) -> HarnessResult<Self> {
        let _ = page
            .execute(EnableParams::default())
            .await
            .map_err(HarnessError::driver)?;
        let requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(HarnessError::driver)?;
        let responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(HarnessError::driver)?;
        let (events, _) = broadcast::channel(NETWORK_CHANNEL_CAPACITY);
        let clock = Arc::new(CdpClock::default());

        let request_clock = Arc::clone(&clock);
        let requests = requests.filter_map(move |e| {
            let clock = Arc::clone(&request_clock);
            async move {
                let method = HttpMethod::parse(&e.request.method)?;
                Some(NetworkEvent::Request {
                    request_id: e.request_id.inner().clone(),
                    method,
                    url: e.request.url.clone(),
                    at: clock.instant(*e.timestamp.inner()),
                })
            }
        });
        let responses = responses.map(move |e| NetworkEvent::Response {
            request_id: e.request_id.inner().clone(),
            status: u16::try_from(e.response.status).unwrap_or(0),
            url: e.response.url.clone(),
            at: clock.instant(*e.timestamp.inner()),
        });
        let sender = events.clone();
        let pump = tokio::spawn(async move {
            let mut merged = futures::stream::select(requests.boxed(), responses.boxed());
            while let Some(event) = merged.next().await {
                let _ = sender.send(event);
            }
        });
        Ok(Self {
            page,
            browser,
            context,
            events,
            pump,
            closed: AtomicBool::new(false),
        })
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> HarnessResult<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(HarnessError::driver)?
            .into_value()
            .map_err(HarnessError::driver)
    }

    async fn on_element(&self, element: &ElementHandle, body: &str) -> HarnessResult<()> {
        let found: bool = self.evaluate(element_script(element, body)?).await?;
        if found {
            Ok(())
        } else {
            Err(HarnessError::driver(format!(
                "element `{}` is detached from the document",
                element.id
            )))
        }
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        let _ = self
            .page
            .goto(url)
            .await
            .map_err(|e| HarnessError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(HarnessError::driver)?
            .unwrap_or_default())
    }

    async fn query_all(
        &self,
        css: &str,
        within: Option<&ElementHandle>,
    ) -> HarnessResult<Vec<ElementHandle>> {
        let script = query_script(css, within.map(|w| w.id.as_str()))?;
        self.evaluate(script).await
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        let target = self
            .page
            .find_element(handle_selector(element))
            .await
            .map_err(HarnessError::driver)?;
        let _ = target.click().await.map_err(HarnessError::driver)?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.on_element(element, CLEAR_BODY).await
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.on_element(element, CARET_END_BODY).await?;
        let target = self
            .page
            .find_element(handle_selector(element))
            .await
            .map_err(HarnessError::driver)?;
        let _ = target.type_str(text).await.map_err(HarnessError::driver)?;
        Ok(())
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        use base64::Engine;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(HarnessError::driver)?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(HarnessError::driver)
    }

    async fn storage_state(&self) -> HarnessResult<StorageState> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(HarnessError::driver)?
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                expires: (c.expires > 0.0).then_some(c.expires as i64),
                http_only: c.http_only,
                secure: c.secure,
                same_site: to_same_site(c.same_site.as_ref()),
            })
            .collect();
        let storage: OriginStorage = self.evaluate(STORAGE_SCRIPT.to_string()).await?;
        let mut state = StorageState {
            cookies,
            ..StorageState::default()
        };
        if !storage.local.is_empty() {
            let _ = state.local_storage.insert(storage.origin.clone(), storage.local);
        }
        if !storage.session.is_empty() {
            let _ = state.session_storage.insert(storage.origin, storage.session);
        }
        Ok(state)
    }

    async fn apply_storage_state(&self, state: &StorageState) -> HarnessResult<()> {
        let mut params = Vec::with_capacity(state.cookies.len());
        for cookie in &state.cookies {
            let param = CookieParam::builder()
                .name(cookie.name.clone())
                .value(cookie.value.clone())
                .domain(cookie.domain.clone())
                .path(cookie.path.clone())
                .http_only(cookie.http_only)
                .secure(cookie.secure)
                .same_site(from_same_site(cookie.same_site))
                .build()
                .map_err(HarnessError::driver)?;
            params.push(param);
        }
        if !params.is_empty() {
            let _ = self
                .page
                .set_cookies(params)
                .await
                .map_err(HarnessError::driver)?;
        }

        let origins = state
            .local_storage
            .keys()
            .chain(state.session_storage.keys())
            .collect::<std::collections::BTreeSet<_>>();
        for origin in origins {
            self.navigate(origin).await?;
            let local = serde_json::to_string(&state.local_storage.get(origin))?;
            let session = serde_json::to_string(&state.session_storage.get(origin))?;
            let script = format!(
                "(() => {{ for (const [k, v] of Object.entries({local} || {{}})) window.localStorage.setItem(k, v); \
                 for (const [k, v] of Object.entries({session} || {{}})) window.sessionStorage.setItem(k, v); return true; }})()"
            );
            let _: bool = self.evaluate(script).await?;
        }
        Ok(())
    }

    fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> HarnessResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.pump.abort();
        let browser = self.browser.lock().await;
        let _ = browser
            .execute(CloseTargetParams::new(self.page.target_id().clone()))
            .await
            .map_err(HarnessError::driver)?;
        let _ = browser
            .execute(DisposeBrowserContextParams::new(self.context.clone()))
            .await
            .map_err(HarnessError::driver)?;
        tracing::debug!(context = ?self.context, "browser context disposed");
        Ok(())
    }
}

/// One Chromium process handing out a fresh context per scenario
#[derive(Debug)]
pub struct ChromiumFactory {
    browser: Arc<Mutex<CdpBrowser>>,
    handler: JoinHandle<()>,
}

impl ChromiumFactory {
    /// Launch Chromium with the configured viewport and head mode
    pub async fn launch(config: &RunConfig) -> HarnessResult<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport.width, config.viewport.height)
            .no_sandbox();
        if !config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder.build().map_err(HarnessError::driver)?;
        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(HarnessError::driver)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        tracing::info!(headless = config.headless, "chromium launched");
        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Close the browser
    pub async fn close(self) -> HarnessResult<()> {
        let mut browser = self.browser.lock().await;
        let _ = browser.close().await.map_err(HarnessError::driver)?;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn open(&self) -> HarnessResult<Arc<dyn Driver>> {
        let (page, context) = {
            let mut browser = self.browser.lock().await;
            let context = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(HarnessError::driver)?;
            let mut target = CreateTargetParams::new("about:blank");
            target.browser_context_id = Some(context.clone());
            let page = browser.new_page(target).await.map_err(HarnessError::driver)?;
            (page, context)
        };
        let driver = ChromiumDriver::new(page, Arc::clone(&self.browser), context).await?;
        Ok(Arc::new(driver))
    }
}
