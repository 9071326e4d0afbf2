use super::{CustomerDetailsModal, PageObject, UrlMatcher};
use crate::capability::{Clickable, Navigable, Surface, Waitable};
use crate::catalog::{self, job_detail};
use crate::driver::url_path;
use crate::result::HarnessResult;

/// Route of one job
pub const JOB_DETAIL_PATTERN: &str = "/job-management/jobs/:id";

/// Job detail view
#[derive(Debug, Clone)]
pub struct JobDetailPage {
    surface: Surface,
}

impl PageObject for JobDetailPage {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn url_pattern(&self) -> Option<&str> {
        Some(JOB_DETAIL_PATTERN)
    }
}

impl Waitable for JobDetailPage {}
impl Clickable for JobDetailPage {}
impl Navigable for JobDetailPage {}

impl JobDetailPage {
    /// Job detail over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::job_detail_v1()),
        }
    }

    /// On a job route with the spinner gone; returns the job id
    pub async fn assert_loaded(&self) -> HarnessResult<String> {
        let url = self.wait_until_on_page().await?;
        self.wait_for_loading().await?;
        let id = UrlMatcher::new(JOB_DETAIL_PATTERN)
            .extract_params(url_path(&url))
            .remove("id")
            .unwrap_or_default();
        Ok(id)
    }

    /// Expand the customer panel
    pub async fn open_view_more(&self) -> HarnessResult<()> {
        self.click(&self.selector(job_detail::VIEW_MORE)?).await?;
        self.wait_for_loading().await
    }

    /// Open the Edit Customer Details modal from the customer actions menu
    pub async fn open_customer_details(&self) -> HarnessResult<CustomerDetailsModal> {
        self.click(&self.selector(job_detail::CUSTOMER_ACTIONS)?)
            .await?;
        let item = self.selector(job_detail::EDIT_CUSTOMER)?;
        let _ = self.wait_visible(&item).await?;
        self.click(&item).await?;
        let modal = CustomerDetailsModal::new(&self.surface);
        modal.wait_open().await?;
        Ok(modal)
    }

    /// Back on the edit screen with job actions available
    pub async fn assert_actions_available(&self) -> HarnessResult<()> {
        let _ = self
            .wait_visible(&self.selector(job_detail::MORE_ACTIONS)?)
            .await?;
        Ok(())
    }
}
