use super::PageObject;
use crate::capability::{Clickable, Readable, Surface, Waitable};
use crate::catalog::{self, merge_modal, shell};
use crate::result::HarnessResult;
use crate::selector::Selector;

/// Notification shown once the merge is stored
pub const PARTS_MERGED: &str = "Parts merged successfully.";

/// Side of the merge modal; the left part survives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    /// Part kept after the merge
    Left,
    /// Part deleted by the merge
    Right,
}

impl MergeSide {
    const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Merge parts modal
#[derive(Debug, Clone)]
pub struct MergePartsModal {
    surface: Surface,
}

impl PageObject for MergePartsModal {
    fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl Waitable for MergePartsModal {}
impl Clickable for MergePartsModal {}
impl Readable for MergePartsModal {}

impl MergePartsModal {
    /// Modal over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::merge_modal_v1()),
        }
    }

    /// Modal visible
    pub async fn wait_open(&self) -> HarnessResult<()> {
        let _ = self.wait_visible(&self.selector(shell::MODAL)?).await?;
        Ok(())
    }

    fn on_side(&self, role: &str, side: MergeSide) -> HarnessResult<Selector> {
        Ok(self
            .selector(role)?
            .nth(side.index())
            .as_role(format!("{} {role}", side.label())))
    }

    /// Code of the part shown on one side, read from its `aria-label`
    pub async fn part_code(&self, side: MergeSide) -> HarnessResult<String> {
        let label = self.on_side(merge_modal::CODE_LABEL, side)?;
        self.read_attribute(&label, "aria-label").await
    }

    /// `(left, right)` part codes
    pub async fn part_codes(&self) -> HarnessResult<(String, String)> {
        let left = self.part_code(MergeSide::Left).await?;
        let right = self.part_code(MergeSide::Right).await?;
        Ok((left, right))
    }

    /// Click the card of the part to keep
    pub async fn choose_survivor(&self, side: MergeSide) -> HarnessResult<()> {
        let column = self.on_side(merge_modal::COLUMN, side)?;
        let card = self.selector(merge_modal::CARD)?.within(column);
        self.click(&card).await
    }

    /// Press Merge & Delete
    pub async fn request_merge(&self) -> HarnessResult<()> {
        self.click(&self.selector(merge_modal::MERGE_AND_DELETE)?)
            .await
    }

    /// Text of the consequence warning
    pub async fn warning_text(&self) -> HarnessResult<String> {
        self.read_text(&self.selector(merge_modal::WARNING)?).await
    }

    /// Press Proceed on the confirmation popover
    pub async fn confirm(&self) -> HarnessResult<()> {
        self.click(&self.selector(merge_modal::PROCEED)?).await?;
        self.wait_for_loading().await
    }

    /// Success notification shown
    pub async fn wait_for_success(&self) -> HarnessResult<()> {
        let _ = self.wait_for_notification(PARTS_MERGED).await?;
        Ok(())
    }
}
