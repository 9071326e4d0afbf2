//! Page objects for the workshop application.
//!
//! Each screen is a thin struct over a [`Surface`] that opts into the
//! capabilities it needs and exposes business operations only. Callers never
//! see selector strings; roles are resolved through the screen's catalog.

use crate::capability::Surface;
use crate::result::HarnessResult;
use crate::selector::Selector;
use std::collections::HashMap;

mod customer_details;
mod job_detail;
mod job_list;
mod login;
mod merge_parts;
mod part_form;
mod parts_list;
mod stock_adjustment;

pub use customer_details::{CustomerDetails, CustomerDetailsModal};
pub use job_detail::JobDetailPage;
pub use job_list::JobListPage;
pub use login::LoginPage;
pub use merge_parts::{MergePartsModal, MergeSide};
pub use part_form::{PartDetails, PartFormPage};
pub use parts_list::{HistoryRow, PartsListPage};
pub use stock_adjustment::{StockAdjustment, StockAdjustmentModal};

/// A screen or modal of the application under test
pub trait PageObject: Send + Sync {
    /// Surface the screen acts through
    fn surface(&self) -> &Surface;

    /// Screen name used in traces
    fn page_name(&self) -> &str {
        self.surface().catalog().name()
    }

    /// Path pattern of the screen's route, if it has one
    fn url_pattern(&self) -> Option<&str> {
        None
    }

    /// Catalog selector for a role
    fn selector(&self, role: &str) -> HarnessResult<Selector> {
        self.surface().catalog().selector(role)
    }
}

/// Route pattern matcher
///
/// Patterns support literal segments (`/login`), one-segment wildcards
/// (`/jobs/*`) and named parameters (`/jobs/:id`).
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Parse a pattern
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();
        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Whether a path matches segment for segment
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        parts.len() == self.segments.len()
            && self.segments.iter().zip(&parts).all(|(seg, part)| match seg {
                UrlSegment::Literal(lit) => lit == part,
                UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
            })
    }

    /// Named parameters of a matching path
    #[must_use]
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        if !self.matches(path) {
            return HashMap::new();
        }
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.segments
            .iter()
            .zip(parts)
            .filter_map(|(seg, part)| match seg {
                UrlSegment::Parameter(name) => Some((name.clone(), part.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod url_matcher_tests {
        use super::*;

        #[test]
        fn test_parameter_and_wildcard() {
            let m = UrlMatcher::new("/job-management/jobs/:id");
            assert!(m.matches("/job-management/jobs/1001"));
            assert!(!m.matches("/job-management/jobs"));
            assert!(!m.matches("/job-management/jobs/1001/edit"));
            assert_eq!(m.extract_params("/job-management/jobs/1001")["id"], "1001");
            assert!(UrlMatcher::new("/inventory/*").matches("/inventory/parts"));
        }

        #[test]
        fn test_non_matching_path_has_no_params() {
            let m = UrlMatcher::new("/job-management/jobs/:id");
            assert!(m.extract_params("/job-management/jobs/1001/edit").is_empty());
            assert!(m.extract_params("/job-management").is_empty());
            assert!(UrlMatcher::new("/inventory/parts/:id")
                .extract_params("/job-management/jobs/7")
                .is_empty());
        }
    }
}
