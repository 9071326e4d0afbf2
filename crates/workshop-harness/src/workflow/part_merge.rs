//! Merge of the first two parts in the list.
//!
//! Both part codes and both on-hand quantities are captured before the merge
//! is confirmed; afterwards the deleted part can no longer be looked up. The
//! consequence warning must be shown before Proceed is pressed.

use super::{Flow, FlowFailure, FlowState, Scenario};
use crate::endpoints::alias;
use crate::pages::{HistoryRow, MergeSide, PartsListPage};
use crate::quantity::Quantity;
use crate::result::{HarnessError, HarnessResult};
use std::time::Instant;

/// Question the merge warning must ask
pub const MERGE_QUESTION: &str = "Are you sure you want to merge these two parts?";
/// Consequence the merge warning must name
pub const MERGE_CONSEQUENCE: &str = "This will delete";
/// Note the survivor's history carries after a merge
pub const MERGED_FROM: &str = "Merged from part number";
/// History entry kind written by a merge
const STOCK_ADJUSTMENT_KIND: &str = "Stock Adjustment";

/// States of a part merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeState {
    /// Parts list loaded
    Idle,
    /// First two rows ticked
    TwoPartsSelected,
    /// Merge modal open
    MergeRequested,
    /// Consequence warning shown and checked
    WarningDisplayed,
    /// Proceed pressed
    Confirmed,
    /// Merge call completed and notification shown
    Completed,
    /// Unexpected UI condition
    Failed,
}

impl FlowState for MergeState {
    const FLOW: &'static str = "part_merge";

    fn initial() -> Self {
        Self::Idle
    }

    fn failed() -> Self {
        Self::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::TwoPartsSelected],
            Self::TwoPartsSelected => &[Self::MergeRequested],
            Self::MergeRequested => &[Self::WarningDisplayed],
            Self::WarningDisplayed => &[Self::Confirmed],
            Self::Confirmed => &[Self::Completed],
            Self::Completed | Self::Failed => &[],
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Idle,
            Self::TwoPartsSelected,
            Self::MergeRequested,
            Self::WarningDisplayed,
            Self::Confirmed,
            Self::Completed,
            Self::Failed,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::TwoPartsSelected => "TwoPartsSelected",
            Self::MergeRequested => "MergeRequested",
            Self::WarningDisplayed => "WarningDisplayed",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    fn is_final(self) -> bool {
        self == Self::Completed
    }
}

/// Completed merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The finished flow
    pub flow: Flow<MergeState>,
    /// Code of the part kept (left)
    pub survivor_code: String,
    /// Code of the part deleted (right)
    pub deleted_code: String,
    /// On-hand quantities of the first and second row before the merge
    pub source_quantities: (Quantity, Quantity),
}

impl MergeOutcome {
    /// On-hand quantity the survivor must show
    #[must_use]
    pub fn expected_survivor_quantity(&self) -> Quantity {
        self.source_quantities.0 + self.source_quantities.1
    }

    /// Fail unless the survivor holds the sum of both sources
    pub fn verify_survivor_quantity(&self, actual: Quantity) -> HarnessResult<()> {
        let expected = self.expected_survivor_quantity();
        if actual == expected {
            Ok(())
        } else {
            Err(HarnessError::assertion(format!(
                "survivor {} holds {actual}, expected {} + {} = {expected}",
                self.survivor_code, self.source_quantities.0, self.source_quantities.1
            )))
        }
    }
}

/// Merge the first two rows of the parts list, keeping the left part
pub async fn merge_first_two_parts(scenario: &Scenario) -> Result<MergeOutcome, FlowFailure> {
    let mut flow = Flow::<MergeState>::new();
    match run(scenario, &mut flow).await {
        Ok((survivor_code, deleted_code, source_quantities)) => {
            tracing::info!(survivor = %survivor_code, deleted = %deleted_code, "parts merged");
            Ok(MergeOutcome {
                flow,
                survivor_code,
                deleted_code,
                source_quantities,
            })
        }
        Err(failure) => Err(scenario.diagnose(failure).await),
    }
}

async fn run(
    scenario: &Scenario,
    flow: &mut Flow<MergeState>,
) -> Result<(String, String, (Quantity, Quantity)), FlowFailure> {
    let surface = scenario.surface();
    let list = PartsListPage::new(&surface);

    let quantities = flow
        .step("select_rows", MergeState::TwoPartsSelected, async {
            list.wait_loaded().await?;
            let rows = list.row_count().await?;
            if rows < 2 {
                return Err(HarnessError::precondition(
                    MergeState::FLOW,
                    format!("merge needs two parts, the list shows {rows}"),
                ));
            }
            let first = list.row_quantity(0).await?;
            let second = list.row_quantity(1).await?;
            list.select_rows(&[0, 1]).await?;
            Ok((first, second))
        })
        .await?;

    flow.require(MergeState::TwoPartsSelected)
        .map_err(|e| flow.fail("request_merge", e))?;
    let modal = flow
        .step("request_merge", MergeState::MergeRequested, list.request_merge())
        .await?;

    let codes = flow
        .step("check_warning", MergeState::WarningDisplayed, async {
            modal.choose_survivor(MergeSide::Left).await?;
            modal.request_merge().await?;
            let warning = modal.warning_text().await?;
            check_warning(&warning)?;
            modal.part_codes().await
        })
        .await?;

    flow.require(MergeState::WarningDisplayed)
        .map_err(|e| flow.fail("confirm", e))?;
    let clicked = Instant::now();
    flow.step("confirm", MergeState::Confirmed, modal.confirm())
        .await?;

    flow.step("await_merged", MergeState::Completed, async {
        let merged = scenario
            .intercepts()
            .wait_for_after(alias::MERGE_PARTS, clicked)
            .await?;
        let _ = merged.expect_success()?;
        modal.wait_for_success().await
    })
    .await?;

    Ok((codes.0, codes.1, quantities))
}

fn check_warning(warning: &str) -> HarnessResult<()> {
    for required in [MERGE_QUESTION, MERGE_CONSEQUENCE] {
        if !warning.contains(required) {
            return Err(HarnessError::assertion(format!(
                "merge warning does not say `{required}`: {warning:?}"
            )));
        }
    }
    Ok(())
}

/// First history row records the merge with quantities filled in
pub fn validate_merge_history(rows: &[HistoryRow]) -> HarnessResult<()> {
    if rows.len() < 2 {
        return Err(HarnessError::assertion(format!(
            "expected at least two history rows after a merge, found {}",
            rows.len()
        )));
    }
    let newest = &rows[0];
    if !newest.kind().contains(STOCK_ADJUSTMENT_KIND) {
        return Err(HarnessError::assertion(format!(
            "newest history row is `{}`, expected `{STOCK_ADJUSTMENT_KIND}`",
            newest.kind()
        )));
    }
    if newest.quantity().is_empty() || newest.on_hand().is_empty() {
        return Err(HarnessError::assertion("merge history row has empty quantities"));
    }
    if !newest.cells.iter().any(|c| c.contains(MERGED_FROM)) {
        return Err(HarnessError::assertion(format!(
            "merge history row does not mention `{MERGED_FROM}`"
        )));
    }
    Ok(())
}

/// Open the survivor, check its history and return its on-hand quantity
pub async fn review_merge(scenario: &Scenario, outcome: &MergeOutcome) -> HarnessResult<Quantity> {
    let surface = scenario.surface();
    let list = PartsListPage::new(&surface);
    list.open_part(&outcome.survivor_code).await?;
    list.wait_for_part_history().await?;
    let rows = list.history_rows().await?;
    validate_merge_history(&rows)?;
    Quantity::parse(rows[0].on_hand())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;

    fn row(kind: &str, moved: &str, on_hand: &str, notes: &str) -> HistoryRow {
        HistoryRow {
            cells: [kind, "17/10/2026", moved, on_hand, "", "", "", notes]
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }

    mod warning_tests {
        use super::*;

        #[test]
        fn test_warning_needs_question_and_consequence() {
            let full = format!("{MERGE_QUESTION}\n{MERGE_CONSEQUENCE} PART_B.");
            assert!(check_warning(&full).is_ok());
            assert!(check_warning(MERGE_QUESTION).is_err());
            assert!(check_warning("").is_err());
        }
    }

    mod history_tests {
        use super::*;

        #[test]
        fn test_merge_row_accepted() {
            let rows = vec![
                row("Stock Adjustment", "5.00", "15.00", "Merged from part number PART_B"),
                row("Stock Adjustment", "10.00", "10.00", "Initial stock"),
            ];
            assert!(validate_merge_history(&rows).is_ok());
        }

        #[test]
        fn test_missing_merge_note_rejected() {
            let rows = vec![
                row("Stock Adjustment", "5.00", "15.00", "Manual count"),
                row("Created", "0.00", "0.00", ""),
            ];
            let err = validate_merge_history(&rows).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AssertionFailed);
        }

        #[test]
        fn test_single_row_rejected() {
            let rows = vec![row("Stock Adjustment", "5.00", "15.00", "Merged from part number X")];
            assert!(validate_merge_history(&rows).is_err());
        }
    }

    mod quantity_tests {
        use super::*;

        #[test]
        fn test_survivor_sum() {
            let outcome = MergeOutcome {
                flow: Flow::new(),
                survivor_code: "PART_A".into(),
                deleted_code: "PART_B".into(),
                source_quantities: (Quantity::from_units(10), Quantity::from_units(5)),
            };
            assert_eq!(outcome.expected_survivor_quantity().to_string(), "15.00");
            assert!(outcome.verify_survivor_quantity(Quantity::from_units(15)).is_ok());
            assert!(outcome.verify_survivor_quantity(Quantity::from_units(10)).is_err());
        }
    }
}
