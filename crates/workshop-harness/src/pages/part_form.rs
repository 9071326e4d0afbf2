use super::PageObject;
use crate::capability::{Clickable, Fillable, FillMode, Surface, Waitable};
use crate::catalog::{self, part_form};
use crate::result::HarnessResult;

/// Values typed into the part form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDetails {
    /// Part number or code
    pub code: String,
    /// Description
    pub description: String,
    /// Barcode
    pub barcode: String,
}

/// New/edit part form
///
/// The form wrapper stays mounted after saving; the details view renders
/// inside it, so there is no "closed" assertion here.
#[derive(Debug, Clone)]
pub struct PartFormPage {
    surface: Surface,
}

impl PageObject for PartFormPage {
    fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl Waitable for PartFormPage {}
impl Clickable for PartFormPage {}
impl Fillable for PartFormPage {}

impl PartFormPage {
    /// Part form over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::part_form_v1()),
        }
    }

    /// Form wrapper visible
    pub async fn wait_open(&self) -> HarnessResult<()> {
        let _ = self.wait_visible(&self.selector(part_form::WRAPPER)?).await?;
        Ok(())
    }

    /// Replace code, description and barcode
    pub async fn fill_part_details(&self, details: &PartDetails) -> HarnessResult<()> {
        for (role, value) in [
            (part_form::CODE, &details.code),
            (part_form::DESCRIPTION, &details.description),
            (part_form::BARCODE, &details.barcode),
        ] {
            self.fill(&self.selector(role)?, value, FillMode::Replace)
                .await?;
        }
        Ok(())
    }

    /// Flip the Stocked checkbox
    pub async fn toggle_stocked(&self) -> HarnessResult<()> {
        self.click(&self.selector(part_form::STOCKED)?).await
    }

    /// Press Save
    pub async fn click_save(&self) -> HarnessResult<()> {
        self.click(&self.selector(part_form::SAVE)?).await
    }
}
