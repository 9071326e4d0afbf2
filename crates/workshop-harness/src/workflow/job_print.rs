//! Bulk job card print from the job list.

use super::{Flow, FlowFailure, FlowState, Scenario, ScenarioContext};
use crate::endpoints::alias;
use crate::pages::JobListPage;

/// States of a job card print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPrintState {
    /// Anywhere in the authenticated shell
    Idle,
    /// First job ticked
    JobSelected,
    /// Print pressed
    PrintRequested,
    /// Printed marker shown on the first row
    Printed,
    /// Unexpected UI condition
    Failed,
}

impl FlowState for JobPrintState {
    const FLOW: &'static str = "job_print";

    fn initial() -> Self {
        Self::Idle
    }

    fn failed() -> Self {
        Self::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::JobSelected],
            Self::JobSelected => &[Self::PrintRequested],
            Self::PrintRequested => &[Self::Printed],
            Self::Printed | Self::Failed => &[],
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Idle,
            Self::JobSelected,
            Self::PrintRequested,
            Self::Printed,
            Self::Failed,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::JobSelected => "JobSelected",
            Self::PrintRequested => "PrintRequested",
            Self::Printed => "Printed",
            Self::Failed => "Failed",
        }
    }

    fn is_final(self) -> bool {
        self == Self::Printed
    }
}

/// Tick the first job, print its card and wait for the printed marker; the
/// row text is kept in `ctx`
pub async fn print_first_job_card(
    scenario: &Scenario,
    ctx: &mut ScenarioContext,
) -> Result<Flow<JobPrintState>, FlowFailure> {
    let mut flow = Flow::<JobPrintState>::new();
    let surface = scenario.surface();
    let list = JobListPage::new(&surface);

    let selected = flow
        .step("select_first_job", JobPrintState::JobSelected, async {
            list.open().await?;
            scenario.intercepts().wait_for(alias::JOB_INDEX).await?;
            list.wait_loaded().await?;
            let row = list.first_row_text().await?;
            list.select_first_job_checkbox().await?;
            Ok(row)
        })
        .await;
    let result = match selected {
        Ok(row) => {
            ctx.selected_job = Some(row);
            print(&mut flow, &list).await
        }
        Err(failure) => Err(failure),
    };
    match result {
        Ok(()) => Ok(flow),
        Err(failure) => Err(scenario.diagnose(failure).await),
    }
}

async fn print(flow: &mut Flow<JobPrintState>, list: &JobListPage) -> Result<(), FlowFailure> {
    flow.step("print_selected", JobPrintState::PrintRequested, list.print_selected())
        .await?;
    flow.step(
        "assert_printed",
        JobPrintState::Printed,
        list.assert_first_job_printed(),
    )
    .await
}
