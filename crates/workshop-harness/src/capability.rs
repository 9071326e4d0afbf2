//! Capability traits for page objects.
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐ ┌───────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐
//! │  PageObject  │──▶│ Waitable  │ │ Clickable │ │ Fillable │ │ Readable │ │ Navigable │
//! │  (surface)   │   └───────────┘ └───────────┘ └──────────┘ └──────────┘ └───────────┘
//! └──────────────┘         opted into per screen with an empty `impl`
//! ```
//!
//! Every action resolves its selector, applies the matching wait, performs
//! the interaction and records a trace entry. Lookup and wait errors are
//! returned unchanged so the workflow sees the originating kind.

use crate::config::{RunConfig, Timeouts};
use crate::driver::{Driver, ElementHandle};
use crate::pages::PageObject;
use crate::result::{HarnessError, HarnessResult};
use crate::selector::{Selector, SelectorCatalog};
use crate::trace::ActionTrace;
use crate::wait::{self, WaitSpec, Waiter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What a page object acts through: one driver, one screen catalog
#[derive(Debug, Clone)]
pub struct Surface {
    driver: Arc<dyn Driver>,
    catalog: Arc<SelectorCatalog>,
    config: Arc<RunConfig>,
    trace: ActionTrace,
    waiter: Waiter,
}

impl Surface {
    /// Create a surface
    #[must_use]
    pub fn new(
        driver: Arc<dyn Driver>,
        catalog: SelectorCatalog,
        config: Arc<RunConfig>,
        trace: ActionTrace,
    ) -> Self {
        let waiter = Waiter::from_timeouts(&config.timeouts);
        Self {
            driver,
            catalog: Arc::new(catalog),
            config,
            trace,
            waiter,
        }
    }

    /// Same driver, config and trace over another screen's catalog
    #[must_use]
    pub fn for_screen(&self, catalog: SelectorCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            ..self.clone()
        }
    }

    /// Driver
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Screen catalog
    #[must_use]
    pub fn catalog(&self) -> &SelectorCatalog {
        &self.catalog
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Named timeouts
    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    /// Action trace
    #[must_use]
    pub const fn trace(&self) -> &ActionTrace {
        &self.trace
    }

    /// Waiter
    #[must_use]
    pub const fn waiter(&self) -> Waiter {
        self.waiter
    }
}

fn resolved(target: &Selector, element: Option<ElementHandle>) -> HarnessResult<ElementHandle> {
    element.ok_or_else(|| HarnessError::SelectorNotFound {
        role: target.role.clone(),
        selector: target.describe(),
        timeout_ms: None,
    })
}

// =============================================================================
// WAITABLE
// =============================================================================

/// Bounded waits on the screen's elements
#[async_trait]
pub trait Waitable: PageObject {
    /// Evaluate one wait spec and trace it
    async fn wait_until(&self, spec: WaitSpec) -> HarnessResult<Option<ElementHandle>> {
        let surface = self.surface();
        let result = surface.waiter().until(surface.driver(), &spec).await;
        let action = format!("wait:{}", spec.condition);
        surface
            .trace()
            .observe(self.page_name(), &spec.target.role, &action, result)
    }

    /// Wait until visible, with the command timeout
    async fn wait_visible(&self, target: &Selector) -> HarnessResult<ElementHandle> {
        let timeout = self.surface().timeouts().command();
        self.wait_visible_within(target, timeout).await
    }

    /// Wait until visible, with an explicit timeout
    async fn wait_visible_within(
        &self,
        target: &Selector,
        timeout: Duration,
    ) -> HarnessResult<ElementHandle> {
        let found = self
            .wait_until(WaitSpec::visible(target.clone(), timeout))
            .await?;
        resolved(target, found)
    }

    /// Wait until visible and enabled
    async fn wait_enabled(&self, target: &Selector) -> HarnessResult<ElementHandle> {
        let timeout = self.surface().timeouts().command();
        let found = self
            .wait_until(WaitSpec::enabled(target.clone(), timeout))
            .await?;
        resolved(target, found)
    }

    /// Wait until gone or hidden
    async fn wait_absent(&self, target: &Selector, timeout: Duration) -> HarnessResult<()> {
        let _ = self
            .wait_until(WaitSpec::absent(target.clone(), timeout))
            .await?;
        Ok(())
    }

    /// Wait until the element shows `text`
    async fn wait_for_text(&self, target: &Selector, text: &str) -> HarnessResult<ElementHandle> {
        let timeout = self.surface().timeouts().command();
        let found = self
            .wait_until(WaitSpec::contains_text(target.clone(), text, timeout))
            .await?;
        resolved(target, found)
    }

    /// Wait for the loading spinner to go away
    async fn wait_for_loading(&self) -> HarnessResult<()> {
        let surface = self.surface();
        let spec = wait::spinner_absent(surface.catalog(), surface.timeouts())?;
        let _ = self.wait_until(spec).await?;
        Ok(())
    }

    /// Wait for a notification showing `text`
    async fn wait_for_notification(&self, text: &str) -> HarnessResult<ElementHandle> {
        let surface = self.surface();
        let spec = wait::notification_contains(surface.catalog(), text, surface.timeouts())?;
        let target = spec.target.clone();
        let found = self.wait_until(spec).await?;
        resolved(&target, found)
    }
}

// =============================================================================
// CLICKABLE
// =============================================================================

/// Clicks on enabled elements
#[async_trait]
pub trait Clickable: PageObject {
    /// Wait until enabled, then click
    async fn click(&self, target: &Selector) -> HarnessResult<()> {
        let surface = self.surface();
        let spec = WaitSpec::enabled(target.clone(), surface.timeouts().command());
        let result = async {
            let element = resolved(target, surface.waiter().until(surface.driver(), &spec).await?)?;
            surface.driver().click(&element).await
        }
        .await;
        surface
            .trace()
            .observe(self.page_name(), &target.role, "click", result)
    }
}

// =============================================================================
// FILLABLE
// =============================================================================

/// How typed text meets the field's current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Clear the field first
    #[default]
    Replace,
    /// Type after whatever the field shows
    Append,
}

/// Text entry
///
/// After typing, the field is re-read and must be non-empty. The value is
/// never compared with the typed text: inputs may reformat what they get.
#[async_trait]
pub trait Fillable: PageObject {
    /// Type `text` into the field
    async fn fill(&self, target: &Selector, text: &str, mode: FillMode) -> HarnessResult<()> {
        let surface = self.surface();
        let spec = WaitSpec::enabled(target.clone(), surface.timeouts().command());
        let result = async {
            let element = resolved(target, surface.waiter().until(surface.driver(), &spec).await?)?;
            if mode == FillMode::Replace {
                surface.driver().clear(&element).await?;
            }
            surface.driver().type_text(&element, text).await?;
            let after = target.find(surface.driver()).await?;
            if !text.is_empty() && after.value.as_deref().unwrap_or_default().trim().is_empty() {
                return Err(HarnessError::assertion(format!(
                    "field `{}` is still empty after typing",
                    target.role
                )));
            }
            Ok(())
        }
        .await;
        let action = match mode {
            FillMode::Replace => "fill",
            FillMode::Append => "append",
        };
        surface
            .trace()
            .observe(self.page_name(), &target.role, action, result)
    }
}

// =============================================================================
// READABLE
// =============================================================================

/// Reads of rendered state
#[async_trait]
pub trait Readable: PageObject {
    /// Trimmed rendered text of a visible element
    async fn read_text(&self, target: &Selector) -> HarnessResult<String> {
        let surface = self.surface();
        let spec = WaitSpec::visible(target.clone(), surface.timeouts().command());
        let result = async {
            let element = resolved(target, surface.waiter().until(surface.driver(), &spec).await?)?;
            Ok(element.trimmed_text().to_string())
        }
        .await;
        surface
            .trace()
            .observe(self.page_name(), &target.role, "read:text", result)
    }

    /// Trimmed attribute of a visible element; a missing attribute fails
    async fn read_attribute(&self, target: &Selector, name: &str) -> HarnessResult<String> {
        let surface = self.surface();
        let spec = WaitSpec::visible(target.clone(), surface.timeouts().command());
        let result = async {
            let element = resolved(target, surface.waiter().until(surface.driver(), &spec).await?)?;
            element
                .attribute(name)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| {
                    HarnessError::assertion(format!("`{}` has no `{name}` attribute", target.role))
                })
        }
        .await;
        surface
            .trace()
            .observe(self.page_name(), &target.role, "read:attribute", result)
    }

    /// Current form value of a visible input
    async fn read_value(&self, target: &Selector) -> HarnessResult<String> {
        let surface = self.surface();
        let spec = WaitSpec::visible(target.clone(), surface.timeouts().command());
        let result = async {
            let element = resolved(target, surface.waiter().until(surface.driver(), &spec).await?)?;
            Ok(element.value.unwrap_or_default())
        }
        .await;
        surface
            .trace()
            .observe(self.page_name(), &target.role, "read:value", result)
    }

    /// Trimmed text of every candidate, in document order, without waiting
    async fn read_all_text(&self, target: &Selector) -> HarnessResult<Vec<String>> {
        let surface = self.surface();
        let result = target
            .find_all(surface.driver())
            .await
            .map(|found| {
                found
                    .iter()
                    .map(|e| e.trimmed_text().to_string())
                    .collect::<Vec<_>>()
            });
        surface
            .trace()
            .observe(self.page_name(), &target.role, "read:all", result)
    }

    /// Number of visible candidates right now
    async fn count_visible(&self, target: &Selector) -> HarnessResult<usize> {
        match target.find_all(self.surface().driver()).await {
            Ok(found) => Ok(found.iter().filter(|e| e.visible).count()),
            Err(HarnessError::SelectorNotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// NAVIGABLE
// =============================================================================

/// Route-level movement
#[async_trait]
pub trait Navigable: PageObject {
    /// Visit a site-relative path
    async fn visit(&self, path: &str) -> HarnessResult<()> {
        let surface = self.surface();
        let url = surface.config().url(path);
        let result = surface
            .driver()
            .navigate(&url)
            .await
            .map_err(|e| match e {
                HarnessError::Driver { message } => HarnessError::Navigation {
                    url: url.clone(),
                    message,
                },
                other => other,
            });
        surface
            .trace()
            .observe(self.page_name(), "location", &format!("visit:{path}"), result)
    }

    /// Wait until the URL path has `segment` as one of its segments
    async fn wait_for_path_segment(&self, segment: &str, timeout: Duration) -> HarnessResult<String> {
        let surface = self.surface();
        let description = format!("path with segment `{segment}`");
        let result = surface
            .waiter()
            .until_url(
                surface.driver(),
                &description,
                |url| wait::has_path_segment(url, segment),
                timeout,
            )
            .await;
        surface
            .trace()
            .observe(self.page_name(), "location", "wait:url", result)
    }

    /// Wait until the URL path matches this screen's pattern
    async fn wait_until_on_page(&self) -> HarnessResult<String> {
        let surface = self.surface();
        let Some(pattern) = self.url_pattern() else {
            return surface.driver().current_url().await;
        };
        let matcher = crate::pages::UrlMatcher::new(pattern);
        let description = format!("path matching `{pattern}`");
        let result = surface
            .waiter()
            .until_url(
                surface.driver(),
                &description,
                |url| matcher.matches(crate::driver::url_path(url)),
                surface.timeouts().page_load(),
            )
            .await;
        surface
            .trace()
            .observe(self.page_name(), "location", "wait:page", result)
    }
}
