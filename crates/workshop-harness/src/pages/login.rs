use super::PageObject;
use crate::capability::{Clickable, Fillable, FillMode, Navigable, Surface, Waitable};
use crate::catalog::{self, login};
use crate::config::Credentials;
use crate::result::HarnessResult;
use crate::wait::has_path_segment;

/// Route of the login form
pub const LOGIN_PATH: &str = "/login";
/// Protected route used to confirm a session
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Login form
#[derive(Debug, Clone)]
pub struct LoginPage {
    surface: Surface,
}

impl PageObject for LoginPage {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn url_pattern(&self) -> Option<&str> {
        Some(LOGIN_PATH)
    }
}

impl Waitable for LoginPage {}
impl Clickable for LoginPage {}
impl Fillable for LoginPage {}
impl Navigable for LoginPage {}

impl LoginPage {
    /// Login page over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::login_v1()),
        }
    }

    /// Visit the login route
    pub async fn open(&self) -> HarnessResult<()> {
        self.visit(LOGIN_PATH).await
    }

    /// Type the credentials and press the login button
    pub async fn submit_credentials(&self, credentials: &Credentials) -> HarnessResult<()> {
        let field_timeout = self.surface.timeouts().login_field();
        let username = self.selector(login::USERNAME)?;
        let _ = self.wait_visible_within(&username, field_timeout).await?;
        self.fill(&username, &credentials.username, FillMode::Replace)
            .await?;

        let password = self.selector(login::PASSWORD)?;
        let _ = self.wait_visible_within(&password, field_timeout).await?;
        self.fill(&password, &credentials.password, FillMode::Replace)
            .await?;

        self.click(&self.selector(login::SUBMIT)?).await
    }

    /// Wait until the app routes to the authenticated shell
    pub async fn wait_for_authenticated_shell(&self) -> HarnessResult<String> {
        let timeout = self.surface.timeouts().authenticated_url();
        self.wait_for_path_segment("dashboard", timeout).await
    }

    /// Visit a protected route and report whether it stayed off the login page
    pub async fn probe_authenticated(&self) -> HarnessResult<bool> {
        self.visit(DASHBOARD_PATH).await?;
        self.wait_for_loading().await?;
        let url = self.surface.driver().current_url().await?;
        let authenticated = !has_path_segment(&url, "login") && has_path_segment(&url, "dashboard");
        tracing::debug!(url = %url, authenticated, "session probe");
        Ok(authenticated)
    }
}
