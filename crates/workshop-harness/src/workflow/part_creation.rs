//! Part creation from the inventory menu.

use super::{Flow, FlowFailure, FlowState, Scenario, ScenarioContext};
use crate::endpoints::alias;
use crate::pages::{PartDetails, PartsListPage};
use std::time::Instant;

/// States of part creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartCreationState {
    /// Anywhere in the authenticated shell
    Idle,
    /// New part form shown
    FormOpened,
    /// Code, description and barcode typed, stocked ticked
    FormFilled,
    /// Save pressed
    SaveRequested,
    /// Create call completed and part details shown
    Created,
    /// Unexpected UI condition
    Failed,
}

impl FlowState for PartCreationState {
    const FLOW: &'static str = "part_creation";

    fn initial() -> Self {
        Self::Idle
    }

    fn failed() -> Self {
        Self::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::FormOpened],
            Self::FormOpened => &[Self::FormFilled],
            Self::FormFilled => &[Self::SaveRequested],
            Self::SaveRequested => &[Self::Created],
            Self::Created | Self::Failed => &[],
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Idle,
            Self::FormOpened,
            Self::FormFilled,
            Self::SaveRequested,
            Self::Created,
            Self::Failed,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::FormOpened => "FormOpened",
            Self::FormFilled => "FormFilled",
            Self::SaveRequested => "SaveRequested",
            Self::Created => "Created",
            Self::Failed => "Failed",
        }
    }

    fn is_final(self) -> bool {
        self == Self::Created
    }
}

/// Create a stocked part; leaves the browser on its details view
pub async fn create_part(
    scenario: &Scenario,
    ctx: &mut ScenarioContext,
    details: &PartDetails,
) -> Result<Flow<PartCreationState>, FlowFailure> {
    let mut flow = Flow::<PartCreationState>::new();
    match run(scenario, ctx, &mut flow, details).await {
        Ok(()) => {
            tracing::info!(code = %details.code, "part created");
            ctx.created_parts.push(details.code.clone());
            Ok(flow)
        }
        Err(failure) => Err(scenario.diagnose(failure).await),
    }
}

async fn run(
    scenario: &Scenario,
    ctx: &mut ScenarioContext,
    flow: &mut Flow<PartCreationState>,
    details: &PartDetails,
) -> Result<(), FlowFailure> {
    let surface = scenario.surface();
    let list = PartsListPage::new(&surface);

    let menu_open = ctx.inventory_menu_open;
    let form = flow
        .step("start_new_part", PartCreationState::FormOpened, async {
            if menu_open {
                list.return_to_list().await?;
            } else {
                list.open_from_menu().await?;
            }
            list.start_new_part().await
        })
        .await?;
    ctx.inventory_menu_open = true;

    flow.step("fill_part_details", PartCreationState::FormFilled, async {
        form.fill_part_details(details).await?;
        form.toggle_stocked().await
    })
    .await?;

    let clicked = Instant::now();
    flow.step("click_save", PartCreationState::SaveRequested, form.click_save())
        .await?;

    flow.step("await_created", PartCreationState::Created, async {
        let created = scenario
            .intercepts()
            .wait_for_after(alias::CREATE_PART, clicked)
            .await?;
        let _ = created.expect_success()?;
        list.wait_for_details().await
    })
    .await
}
