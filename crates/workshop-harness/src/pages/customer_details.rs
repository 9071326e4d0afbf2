use super::PageObject;
use crate::capability::{Clickable, Fillable, FillMode, Surface, Waitable};
use crate::catalog::{self, customer_details};
use crate::result::HarnessResult;

/// Values typed into the customer modal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Mobile number
    pub mobile_number: String,
    /// Landline, left untouched when `None`
    pub phone_number: Option<String>,
    /// Email, left untouched when `None`
    pub email: Option<String>,
}

/// Edit Customer Details modal
#[derive(Debug, Clone)]
pub struct CustomerDetailsModal {
    surface: Surface,
}

impl PageObject for CustomerDetailsModal {
    fn surface(&self) -> &Surface {
        &self.surface
    }
}

impl Waitable for CustomerDetailsModal {}
impl Clickable for CustomerDetailsModal {}
impl Fillable for CustomerDetailsModal {}

impl CustomerDetailsModal {
    /// Modal over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::customer_details_v1()),
        }
    }

    /// The modal container is visible
    pub async fn wait_open(&self) -> HarnessResult<()> {
        let _ = self
            .wait_visible(&self.selector(customer_details::CONTAINER)?)
            .await?;
        Ok(())
    }

    /// Replace every provided field
    pub async fn fill_customer_details(&self, details: &CustomerDetails) -> HarnessResult<()> {
        let required = [
            (customer_details::FIRST_NAME, &details.first_name),
            (customer_details::LAST_NAME, &details.last_name),
            (customer_details::MOBILE, &details.mobile_number),
        ];
        for (role, value) in required {
            self.fill(&self.selector(role)?, value, FillMode::Replace)
                .await?;
        }
        if let Some(phone) = &details.phone_number {
            self.fill(&self.selector(customer_details::PHONE)?, phone, FillMode::Replace)
                .await?;
        }
        if let Some(email) = &details.email {
            self.fill(&self.selector(customer_details::EMAIL)?, email, FillMode::Replace)
                .await?;
        }
        Ok(())
    }

    /// Press Save
    pub async fn click_save(&self) -> HarnessResult<()> {
        self.click(&self.selector(customer_details::SAVE)?).await
    }

    /// The modal container is gone
    pub async fn assert_closed(&self) -> HarnessResult<()> {
        let timeout = self.surface.timeouts().command();
        self.wait_absent(&self.selector(customer_details::CONTAINER)?, timeout)
            .await
    }
}
