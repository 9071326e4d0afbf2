//! Selectors and selector catalogs.
//!
//! A [`Selector`] is a named, scoped lookup rule. Resolution never guesses:
//! with the default [`Pick::Exactly`], zero matches is
//! [`HarnessError::SelectorNotFound`] and several matches is
//! [`HarnessError::SelectorAmbiguous`]. Taking the first of many is an
//! explicit [`Pick::First`] written into the catalog entry.

use crate::driver::{Driver, ElementHandle};
use crate::result::{HarnessError, HarnessResult};
use futures::future::{BoxFuture, FutureExt};
use regex::RegexBuilder;
use std::collections::BTreeMap;

// =============================================================================
// SELECTOR
// =============================================================================

/// Text predicate applied after the CSS lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// Rendered text contains the string (case-sensitive)
    Contains(String),
    /// Rendered text matches the pattern (case-insensitive)
    Pattern(String),
}

impl TextMatch {
    /// Check rendered text
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Contains(needle) => text.contains(needle.as_str()),
            Self::Pattern(pattern) => RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(|re| re.is_match(text))
                .unwrap_or(false),
        }
    }
}

impl std::fmt::Display for TextMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contains(s) => write!(f, ":has-text({s:?})"),
            Self::Pattern(p) => write!(f, ":text-matches(/{p}/i)"),
        }
    }
}

/// Which of the matching elements the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pick {
    /// Exactly one must match
    #[default]
    Exactly,
    /// The first in document order
    First,
    /// The n-th (zero-based) in document order
    Nth(usize),
}

/// Where the lookup starts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Whole document
    #[default]
    Document,
    /// Descendants of the element another selector resolves to
    Within(Box<Selector>),
}

/// A named, scoped rule for locating one UI element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Semantic role, e.g. "save button"
    pub role: String,
    /// CSS expression
    pub css: String,
    /// Optional text predicate
    pub text: Option<TextMatch>,
    /// Lookup scope
    pub scope: Scope,
    /// Pick rule
    pub pick: Pick,
}

impl Selector {
    /// Document-scoped CSS selector expecting exactly one match
    #[must_use]
    pub fn css(role: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            css: css.into(),
            text: None,
            scope: Scope::Document,
            pick: Pick::Exactly,
        }
    }

    /// Require the rendered text to contain `text`
    #[must_use]
    pub fn containing(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Contains(text.into()));
        self
    }

    /// Require the rendered text to match a case-insensitive pattern
    #[must_use]
    pub fn matching_text(mut self, pattern: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Pattern(pattern.into()));
        self
    }

    /// Look only inside `container`
    #[must_use]
    pub fn within(mut self, container: Self) -> Self {
        self.scope = Scope::Within(Box::new(container));
        self
    }

    /// Take the first match
    #[must_use]
    pub const fn first(mut self) -> Self {
        self.pick = Pick::First;
        self
    }

    /// Take the n-th match (zero-based)
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.pick = Pick::Nth(index);
        self
    }

    /// Rename the role, e.g. when deriving a row selector for one index
    #[must_use]
    pub fn as_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Human-readable lookup expression
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Scope::Within(container) = &self.scope {
            out.push_str(&container.describe());
            out.push_str(" >> ");
        }
        out.push_str(&self.css);
        if let Some(text) = &self.text {
            out.push_str(&text.to_string());
        }
        match self.pick {
            Pick::Exactly => {}
            Pick::First => out.push_str(" >> first"),
            Pick::Nth(n) => out.push_str(&format!(" >> nth={n}")),
        }
        out
    }

    /// Every element the CSS, scope and text predicate admit, before picking
    pub fn candidates<'a>(
        &'a self,
        driver: &'a dyn Driver,
    ) -> BoxFuture<'a, HarnessResult<Vec<ElementHandle>>> {
        async move {
            let container = match &self.scope {
                Scope::Document => None,
                Scope::Within(outer) => Some(outer.find(driver).await?),
            };
            let found = driver.query_all(&self.css, container.as_ref()).await?;
            Ok(match &self.text {
                Some(text) => found.into_iter().filter(|e| text.matches(&e.text)).collect(),
                None => found,
            })
        }
        .boxed()
    }

    /// Apply the pick rule
    pub fn pick_from(&self, mut candidates: Vec<ElementHandle>) -> HarnessResult<ElementHandle> {
        let not_found = || HarnessError::SelectorNotFound {
            role: self.role.clone(),
            selector: self.describe(),
            timeout_ms: None,
        };
        match self.pick {
            Pick::Exactly => match candidates.len() {
                0 => Err(not_found()),
                1 => Ok(candidates.remove(0)),
                count => Err(HarnessError::SelectorAmbiguous {
                    role: self.role.clone(),
                    selector: self.describe(),
                    count,
                }),
            },
            Pick::First => candidates.into_iter().next().ok_or_else(not_found),
            Pick::Nth(n) => candidates.into_iter().nth(n).ok_or_else(not_found),
        }
    }

    /// Resolve to one element right now, without waiting
    pub fn find<'a>(&'a self, driver: &'a dyn Driver) -> BoxFuture<'a, HarnessResult<ElementHandle>> {
        async move {
            let candidates = self.candidates(driver).await?;
            self.pick_from(candidates)
        }
        .boxed()
    }

    /// Every candidate, in document order; an absent container fails the lookup
    pub async fn find_all(&self, driver: &dyn Driver) -> HarnessResult<Vec<ElementHandle>> {
        self.candidates(driver).await
    }

    /// Number of elements the pick rule could choose from
    pub async fn count(&self, driver: &dyn Driver) -> HarnessResult<usize> {
        match self.candidates(driver).await {
            Ok(found) => Ok(found.len()),
            Err(HarnessError::SelectorNotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.role, self.describe())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Named, versioned map from semantic roles to selectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCatalog {
    name: String,
    version: u32,
    entries: BTreeMap<String, Selector>,
}

impl SelectorCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            entries: BTreeMap::new(),
        }
    }

    /// Add an entry under its role, replacing any previous one
    #[must_use]
    pub fn with(mut self, selector: Selector) -> Self {
        let _ = self.entries.insert(selector.role.clone(), selector);
        self
    }

    /// Merge another catalog's entries; existing roles win
    #[must_use]
    pub fn include(mut self, other: &Self) -> Self {
        for (role, selector) in &other.entries {
            let _ = self
                .entries
                .entry(role.clone())
                .or_insert_with(|| selector.clone());
        }
        self
    }

    /// Selector for a role
    pub fn get(&self, role: &str) -> HarnessResult<&Selector> {
        self.entries.get(role).ok_or_else(|| HarnessError::UnknownRole {
            catalog: self.label(),
            role: role.to_string(),
        })
    }

    /// Owned selector for a role, for deriving scoped or indexed variants
    pub fn selector(&self, role: &str) -> HarnessResult<Selector> {
        self.get(role).cloned()
    }

    /// Catalog name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog version
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// `name@vN`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}@v{}", self.name, self.version)
    }

    /// All roles, sorted
    #[must_use]
    pub fn roles(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
