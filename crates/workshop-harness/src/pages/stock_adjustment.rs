use super::PageObject;
use crate::capability::{Clickable, Fillable, FillMode, Readable, Surface, Waitable};
use crate::catalog::{self, stock_adjustment};
use crate::result::HarnessResult;

/// Notification shown once the adjustment is stored
pub const STOCK_UPDATED: &str = "Stock level updated successfully.";

/// Values typed into the stock adjustment modal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    /// Quantity change as typed, e.g. "10"
    pub delta: String,
    /// Free-text notes
    pub notes: String,
}

/// Stock adjustment modal
#[derive(Debug, Clone)]
pub struct StockAdjustmentModal {
    surface: Surface,
}

impl PageObject for StockAdjustmentModal {
    fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl Waitable for StockAdjustmentModal {}
impl Clickable for StockAdjustmentModal {}
impl Fillable for StockAdjustmentModal {}
impl Readable for StockAdjustmentModal {}

impl StockAdjustmentModal {
    /// Modal over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::stock_adjustment_v1()),
        }
    }

    /// Delta field visible
    pub async fn wait_open(&self) -> HarnessResult<()> {
        let _ = self
            .wait_visible(&self.selector(stock_adjustment::DELTA)?)
            .await?;
        Ok(())
    }

    /// What the delta field shows before typing, e.g. "0.00"
    pub async fn placeholder_value(&self) -> HarnessResult<String> {
        self.read_value(&self.selector(stock_adjustment::DELTA)?)
            .await
    }

    /// Type the delta after the placeholder; the field is never cleared
    pub async fn enter_delta(&self, delta: &str) -> HarnessResult<()> {
        self.fill(&self.selector(stock_adjustment::DELTA)?, delta, FillMode::Append)
            .await
    }

    /// Type the notes
    pub async fn enter_notes(&self, notes: &str) -> HarnessResult<()> {
        self.fill(&self.selector(stock_adjustment::NOTES)?, notes, FillMode::Append)
            .await
    }

    /// Press Confirm
    pub async fn confirm(&self) -> HarnessResult<()> {
        self.click(&self.selector(stock_adjustment::CONFIRM)?).await
    }

    /// Success notification shown
    pub async fn wait_for_success(&self) -> HarnessResult<()> {
        let _ = self.wait_for_notification(STOCK_UPDATED).await?;
        Ok(())
    }
}
