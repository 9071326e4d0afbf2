use super::PageObject;
use crate::capability::{Clickable, Navigable, Readable, Surface, Waitable};
use crate::catalog::{self, job_list};
use crate::result::{HarnessError, HarnessResult};

/// Route of the job list
pub const JOB_LIST_PATH: &str = "/job-management/jobs";

/// Class Ant Design puts on a checked checkbox wrapper
const CHECKED_CLASS: &str = "ant-checkbox-wrapper-checked";

/// Column of the printed marker
const PRINTED_COLUMN: usize = 10;

/// Job list table
#[derive(Debug, Clone)]
pub struct JobListPage {
    surface: Surface,
}

impl PageObject for JobListPage {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn url_pattern(&self) -> Option<&str> {
        Some(JOB_LIST_PATH)
    }
}

impl Waitable for JobListPage {}
impl Clickable for JobListPage {}
impl Readable for JobListPage {}
impl Navigable for JobListPage {}

impl JobListPage {
    /// Job list over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::job_list_v1()),
        }
    }

    /// Visit the job list route
    pub async fn open(&self) -> HarnessResult<()> {
        self.visit(JOB_LIST_PATH).await
    }

    /// Spinner gone and a first row rendered
    pub async fn wait_loaded(&self) -> HarnessResult<()> {
        self.wait_for_loading().await?;
        let _ = self.wait_visible(&self.selector(job_list::FIRST_ROW)?).await?;
        Ok(())
    }

    /// Trimmed text of the first job row
    pub async fn first_row_text(&self) -> HarnessResult<String> {
        self.read_text(&self.selector(job_list::FIRST_ROW)?).await
    }

    /// Open the first job through its row link
    pub async fn select_first_job(&self) -> HarnessResult<()> {
        self.click(&self.selector(job_list::ROW_LINK)?).await
    }

    /// Tick the first row's checkbox and confirm it took
    pub async fn select_first_job_checkbox(&self) -> HarnessResult<()> {
        let checkbox = self.selector(job_list::ROW_CHECKBOX)?;
        self.click(&checkbox).await?;
        let class = self.read_attribute(&checkbox, "class").await?;
        if class.split_whitespace().any(|c| c == CHECKED_CLASS) {
            Ok(())
        } else {
            Err(HarnessError::assertion("first job checkbox did not become checked"))
        }
    }

    /// Press the bulk print button
    pub async fn print_selected(&self) -> HarnessResult<()> {
        self.click(&self.selector(job_list::PRINT_BUTTON)?).await
    }

    /// The printed marker shows in the first row
    pub async fn assert_first_job_printed(&self) -> HarnessResult<()> {
        let cell = self
            .selector(job_list::ROW_CELL)?
            .nth(PRINTED_COLUMN)
            .as_role("printed column");
        let icon = self.selector(job_list::PRINTED_ICON)?.within(cell);
        let _ = self.wait_visible(&icon).await?;
        Ok(())
    }
}
