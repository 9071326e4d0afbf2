//! Customer details edit on a job.
//!
//! `Persisted` is entered only once the customer update and the job refetch
//! that follows it have both completed, in that order. The modal is checked
//! for absence only after that, since the UI can show stale values between
//! the two calls.

use super::{Flow, FlowFailure, FlowState, Scenario, ScenarioContext};
use crate::endpoints::alias;
use crate::intercept::InterceptedCall;
use crate::pages::{CustomerDetails, JobDetailPage, JobListPage};
use crate::result::HarnessResult;
use std::time::Instant;

/// States of the customer details edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerEditState {
    /// On the job detail view
    Idle,
    /// Edit Customer Details modal open
    DetailsOpened,
    /// New values typed
    FormFilled,
    /// Save pressed
    SaveRequested,
    /// Update and refetch both completed
    Persisted,
    /// Modal gone, job actions available
    ModalClosed,
    /// Unexpected UI condition
    Failed,
}

impl FlowState for CustomerEditState {
    const FLOW: &'static str = "customer_edit";

    fn initial() -> Self {
        Self::Idle
    }

    fn failed() -> Self {
        Self::Failed
    }

    fn successors(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::DetailsOpened],
            Self::DetailsOpened => &[Self::FormFilled],
            Self::FormFilled => &[Self::SaveRequested],
            Self::SaveRequested => &[Self::Persisted],
            Self::Persisted => &[Self::ModalClosed],
            Self::ModalClosed | Self::Failed => &[],
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::Idle,
            Self::DetailsOpened,
            Self::FormFilled,
            Self::SaveRequested,
            Self::Persisted,
            Self::ModalClosed,
            Self::Failed,
        ]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::DetailsOpened => "DetailsOpened",
            Self::FormFilled => "FormFilled",
            Self::SaveRequested => "SaveRequested",
            Self::Persisted => "Persisted",
            Self::ModalClosed => "ModalClosed",
            Self::Failed => "Failed",
        }
    }

    fn is_final(self) -> bool {
        self == Self::ModalClosed
    }
}

/// Completed customer edit
#[derive(Debug, Clone)]
pub struct CustomerEditOutcome {
    /// The finished flow
    pub flow: Flow<CustomerEditState>,
    /// Customer update call
    pub update: InterceptedCall,
    /// Job refetch that followed the update
    pub refetch: InterceptedCall,
}

/// Open the job list, remember the first row and open that job; returns the
/// job id
pub async fn open_first_job(
    scenario: &Scenario,
    ctx: &mut ScenarioContext,
) -> Result<String, FlowFailure> {
    let surface = scenario.surface();
    let list = JobListPage::new(&surface);
    let detail = JobDetailPage::new(&surface);
    let result: HarnessResult<(String, String)> = async {
        list.open().await?;
        scenario.intercepts().wait_for(alias::JOB_INDEX).await?;
        list.wait_loaded().await?;
        let row = list.first_row_text().await?;
        list.select_first_job().await?;
        let id = detail.assert_loaded().await?;
        Ok((row, id))
    }
    .await;
    match result {
        Ok((row, id)) => {
            tracing::info!(job = %id, "selected first job");
            ctx.selected_job = Some(row);
            ctx.job_id = Some(id.clone());
            Ok(id)
        }
        Err(e) => {
            let failure = FlowFailure::new("job_selection", "Idle", "open_first_job", e);
            Err(scenario.diagnose(failure).await)
        }
    }
}

/// Edit the customer of the job currently open
pub async fn edit_customer_details(
    scenario: &Scenario,
    details: &CustomerDetails,
) -> Result<CustomerEditOutcome, FlowFailure> {
    let mut flow = Flow::<CustomerEditState>::new();
    match run(scenario, &mut flow, details).await {
        Ok((update, refetch)) => Ok(CustomerEditOutcome {
            flow,
            update,
            refetch,
        }),
        Err(failure) => Err(scenario.diagnose(failure).await),
    }
}

async fn run(
    scenario: &Scenario,
    flow: &mut Flow<CustomerEditState>,
    details: &CustomerDetails,
) -> Result<(InterceptedCall, InterceptedCall), FlowFailure> {
    let surface = scenario.surface();
    let page = JobDetailPage::new(&surface);
    let intercepts = scenario.intercepts();

    let modal = flow
        .step("open_customer_details", CustomerEditState::DetailsOpened, async {
            page.open_view_more().await?;
            page.open_customer_details().await
        })
        .await?;

    flow.step(
        "fill_customer_details",
        CustomerEditState::FormFilled,
        modal.fill_customer_details(details),
    )
    .await?;

    let clicked = Instant::now();
    flow.step("click_save", CustomerEditState::SaveRequested, modal.click_save())
        .await?;

    let calls = flow
        .step("await_persisted", CustomerEditState::Persisted, async {
            let update = intercepts.wait_for_after(alias::UPDATE_CUSTOMER, clicked).await?;
            let _ = update.expect_success()?;
            let refetch = intercepts
                .wait_for_after(alias::GET_JOB, update.completed_at)
                .await?;
            let _ = refetch.expect_success()?;
            Ok((update, refetch))
        })
        .await?;

    flow.require(CustomerEditState::Persisted)
        .map_err(|e| flow.fail("assert_closed", e))?;
    flow.step("assert_closed", CustomerEditState::ModalClosed, async {
        modal.assert_closed().await?;
        page.assert_actions_available().await
    })
    .await?;

    Ok(calls)
}
