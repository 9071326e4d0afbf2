//! Stock adjustment on the part details view.
//!
//! The delta field starts with a non-empty placeholder such as "0.00". The
//! delta is typed after it without clearing, and the field is only required
//! to be non-empty afterwards since the app reformats numbers. Success is the
//! adjust call completing plus the success notification.

use super::{Flow, FlowFailure, FlowState, Scenario};
use crate::endpoints::alias;
use crate::pages::{HistoryRow, PartsListPage, StockAdjustment};
use crate::quantity::Quantity;
use crate::result::{HarnessError, HarnessResult};
use std::time::Instant;

/// States of a stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockAdjustmentState {
    /// Modal open, nothing typed
    Idle,
    /// Delta typed
    DeltaEntered,
    /// Notes typed
    NotesEntered,
    /// Confirm pressed
    Confirmed,
    /// Adjust call completed and notification shown
    Completed,
    /// Unexpected UI condition
    Failed,
}

impl FlowState for StockAdjustmentState {
    const FLOW: &'static str = "stock_adjustment";

    fn initial() -> Self {
        Self::Idle
    }

    fn failed() -> Self {
        Self::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::DeltaEntered],
            Self::DeltaEntered => &[Self::NotesEntered],
            Self::NotesEntered => &[Self::Confirmed],
            Self::Confirmed => &[Self::Completed],
            Self::Completed | Self::Failed => &[],
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Idle,
            Self::DeltaEntered,
            Self::NotesEntered,
            Self::Confirmed,
            Self::Completed,
            Self::Failed,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::DeltaEntered => "DeltaEntered",
            Self::NotesEntered => "NotesEntered",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    fn is_final(self) -> bool {
        self == Self::Completed
    }
}

/// Completed stock adjustment
#[derive(Debug, Clone)]
pub struct StockAdjustmentOutcome {
    /// The finished flow
    pub flow: Flow<StockAdjustmentState>,
    /// What the delta field showed before typing
    pub placeholder: String,
}

/// Adjust the stock of the part whose details are shown
pub async fn adjust_stock(
    scenario: &Scenario,
    adjustment: &StockAdjustment,
) -> Result<StockAdjustmentOutcome, FlowFailure> {
    let mut flow = Flow::<StockAdjustmentState>::new();
    match run(scenario, &mut flow, adjustment).await {
        Ok(placeholder) => Ok(StockAdjustmentOutcome { flow, placeholder }),
        Err(failure) => Err(scenario.diagnose(failure).await),
    }
}

async fn run(
    scenario: &Scenario,
    flow: &mut Flow<StockAdjustmentState>,
    adjustment: &StockAdjustment,
) -> Result<String, FlowFailure> {
    let surface = scenario.surface();
    let list = PartsListPage::new(&surface);

    let modal = flow
        .attempt("open_stock_adjustment", list.open_stock_adjustment())
        .await?;

    let placeholder = flow
        .step("enter_delta", StockAdjustmentState::DeltaEntered, async {
            let placeholder = modal.placeholder_value().await?;
            if placeholder.trim().is_empty() {
                return Err(HarnessError::assertion("stock delta field has no placeholder"));
            }
            modal.enter_delta(&adjustment.delta).await?;
            Ok(placeholder)
        })
        .await?;

    flow.step(
        "enter_notes",
        StockAdjustmentState::NotesEntered,
        modal.enter_notes(&adjustment.notes),
    )
    .await?;

    let clicked = Instant::now();
    flow.step("confirm", StockAdjustmentState::Confirmed, modal.confirm())
        .await?;

    flow.step("await_adjusted", StockAdjustmentState::Completed, async {
        let adjusted = scenario
            .intercepts()
            .wait_for_after(alias::ADJUST_STOCK, clicked)
            .await?;
        let _ = adjusted.expect_success()?;
        modal.wait_for_success().await
    })
    .await?;

    Ok(placeholder)
}

/// On-hand quantity of the newest history row of the part shown
pub async fn on_hand_from_history(scenario: &Scenario) -> HarnessResult<Quantity> {
    let surface = scenario.surface();
    let list = PartsListPage::new(&surface);
    list.wait_for_part_history().await?;
    let rows = list.history_rows().await?;
    latest_on_hand(&rows)
}

fn latest_on_hand(rows: &[HistoryRow]) -> HarnessResult<Quantity> {
    let newest = rows
        .first()
        .ok_or_else(|| HarnessError::assertion("part history is empty"))?;
    Quantity::parse(newest.on_hand())
}
