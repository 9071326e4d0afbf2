//! Scripted workshop application for the integration tests.
//!
//! Every browsing context is a [`MockDriver`] wired to one shared
//! [`Backend`], so logins, jobs and parts survive across contexts the way
//! they would on a real server. Screens answer to the same CSS expressions
//! the selector catalogs use.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use workshop_harness::driver::{url_path, MockDom, MockEffects};
use workshop_harness::session::Cookie;
use workshop_harness::{
    endpoints, init_tracing, Credentials, Driver, DriverFactory, HarnessResult, HttpMethod,
    LogFormat, MockDriver, MockElement, Quantity, RunConfig, Scenario, SessionCache, Timeouts,
    UiAuthenticator,
};

pub const BASE_URL: &str = "https://workshop.test";
pub const HOST: &str = "workshop.test";
pub const USERNAME: &str = "service.advisor@workshop.test";
pub const PASSWORD: &str = "correct horse";
pub const SESSION_COOKIE: &str = "workshop_session";

const LOGIN_PATH: &str = "/login";
const DASHBOARD_PATH: &str = "/dashboard";
const JOBS_PATH: &str = "/job-management/jobs";
const PARTS_PATH: &str = "/inventory/parts";

const PAGE: &str = "page";
const OVERLAY: &str = "overlay";
const NOTIFICATIONS: &str = "notifications";
const MENU: &str = "side-menu";

const JOB_COLUMNS: usize = 11;
const PRINTED_COLUMN: usize = 10;
const NOTIFICATION_TTL: Duration = Duration::from_millis(1_500);

const CHECKBOX: &str = "ant-checkbox-wrapper";
const CHECKBOX_CHECKED: &str = "ant-checkbox-wrapper ant-checkbox-wrapper-checked";
const DELTA_DEFAULT: &str = "0.00";

mod css {
    pub const SPINNER: &str = ".ant-spin-spinning";
    pub const NOTIFICATION: &str = ".ant-notification-notice-description";
    pub const MODAL: &str = ".ant-modal";

    pub const USERNAME: &str =
        r#"input[type="email"], input[name="username"], input[autocomplete="username"]"#;
    pub const PASSWORD: &str = r#"input[type="password"], input[name="password"], input[autocomplete="current-password"]"#;

    pub const JOB_ROW: &str = r#"tbody tr:not(.ant-table-measure-row):not([aria-hidden="true"])"#;
    pub const JOB_CHECKBOX: &str = "label.ant-checkbox-wrapper";
    pub const BULK_PRINT: &str = "#ut-list-bulk-print";
    pub const PRINTED_ICON: &str = r#"span[aria-label="printed"]"#;

    pub const CUSTOMER_ACTIONS: &str = "#customer-more-action > .ant-btn";
    pub const DROPDOWN_ITEM: &str = ".ant-dropdown-menu-item";
    pub const MODAL_WRAP: &str = "div.ant-modal-wrap";

    pub const INVENTORY_MENU: &str =
        r#"li[id="ut-side-menu-group-inventory"] span[class="ant-menu-title-content"]"#;
    pub const PARTS_MENU_ITEM: &str = "#ut-side-menu-part-list";
    pub const NEW_ENTITY: &str = "#ut-list-add-entity-button";
    pub const MAIN: &str = "main.ant-layout-content";
    pub const TABLE_BODY: &str = "tbody.ant-table-tbody";
    pub const HISTORY_BODY: &str = ".ant-table-tbody";
    pub const TABLE_ROW: &str = "tr.ant-table-row";
    pub const ROW_CHECKBOX: &str = "td.ant-table-selection-column label.ant-checkbox-wrapper";
    pub const ROW_QUANTITY: &str = "td div.text-right";
    pub const CARD_TITLE: &str = ".ant-card-head-title";
    pub const ADJUST_STOCK: &str = "#ut-adjust-stock";

    pub const FORM_WRAPPER: &str = ".page-form-card-wrapper";
    pub const STOCKED: &str = ".ant-checkbox-label";

    pub const DELTA: &str = "input[name='stockAdjustment.delta']";
    pub const NOTES: &str = "input[name='stockAdjustment.notes']";

    pub const MERGE_COLUMN: &str = ".ant-row .ant-col";
    pub const CARD_BODY: &str = ".ant-card-body";
    pub const CODE_LABEL: &str = "span.ant-typography[aria-label]";
    pub const WARNING: &str = ".with-line-breaks";
    pub const PROCEED: &str = ".ant-popconfirm-buttons > .ant-btn-primary";
}

static NEXT_NOTIFICATION: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// BACKEND
// =============================================================================

/// Customer attached to a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: String,
    pub phone_number: String,
    pub email: String,
}

/// Job card
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u32,
    pub customer: Customer,
    pub printed: bool,
}

/// One line of a part's history, newest first
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub kind: String,
    pub quantity: Quantity,
    pub on_hand: Quantity,
    pub notes: String,
}

/// Inventory part
#[derive(Debug, Clone)]
pub struct Part {
    pub id: u32,
    pub code: String,
    pub description: String,
    pub barcode: String,
    pub stocked: bool,
    pub on_hand: Quantity,
    pub history: Vec<HistoryEntry>,
}

impl Part {
    /// Stocked part with an initial adjustment on record
    pub fn stocked(id: u32, code: &str, units: i64) -> Self {
        let on_hand = Quantity::from_units(units);
        Self {
            id,
            code: code.to_string(),
            description: format!("{code} description"),
            barcode: format!("02100000{id:02}"),
            stocked: true,
            on_hand,
            history: vec![HistoryEntry {
                kind: "Stock Adjustment".to_string(),
                quantity: on_hand,
                on_hand,
                notes: "Initial stock".to_string(),
            }],
        }
    }
}

/// Server-side state shared by every browsing context
#[derive(Debug)]
pub struct Backend {
    pub credentials: Credentials,
    pub tokens: Vec<String>,
    pub logins: usize,
    pub jobs: Vec<Job>,
    pub parts: Vec<Part>,
    pub next_part_id: u32,
    /// Delay before the job refetch that follows a customer update
    pub refetch_delay: Duration,
    /// Whether the job is refetched after a customer update at all
    pub refetch_after_update: bool,
    /// Close the customer modal and toast success as soon as the update
    /// answers, ahead of the refetch
    pub early_success: bool,
    /// Keep a collapsed, stale row at the top of each part history table
    pub stale_history_row: bool,
    pub customer_update_status: u16,
    pub merge_status: u16,
    pub merge_delay: Duration,
    pub print_delay: Duration,
}

impl Default for Backend {
    fn default() -> Self {
        let customer = |id: u32, first: &str, last: &str| Customer {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            mobile_number: "0211234567".to_string(),
            phone_number: String::new(),
            email: format!("{}@customer.test", first.to_lowercase()),
        };
        Self {
            credentials: Credentials::new(USERNAME, PASSWORD),
            tokens: Vec::new(),
            logins: 0,
            jobs: vec![
                Job {
                    id: 1001,
                    customer: customer(77, "Aroha", "Ngata"),
                    printed: false,
                },
                Job {
                    id: 1002,
                    customer: customer(78, "Sam", "Walker"),
                    printed: false,
                },
            ],
            parts: vec![Part::stocked(1, "PART_A", 10), Part::stocked(2, "PART_B", 5)],
            next_part_id: 3,
            refetch_delay: Duration::from_millis(120),
            refetch_after_update: true,
            early_success: false,
            stale_history_row: false,
            customer_update_status: 200,
            merge_status: 200,
            merge_delay: Duration::from_millis(60),
            print_delay: Duration::from_millis(40),
        }
    }
}

impl Backend {
    fn part(&self, id: u32) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    fn job(&self, id: u32) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Part by its code
    pub fn part_by_code(&self, code: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.code == code)
    }
}

type Shared = Arc<Mutex<Backend>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Backend> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn url(path: &str) -> String {
    format!("{BASE_URL}{path}")
}

fn api(path: &str) -> String {
    format!("{BASE_URL}/api/{path}")
}

// =============================================================================
// FACTORY
// =============================================================================

/// The scripted application; each [`DriverFactory::open`] is a new context
#[derive(Debug, Clone, Default)]
pub struct Workshop {
    shared: Shared,
    contexts: Arc<Mutex<Vec<MockDriver>>>,
}

impl Workshop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect or change server state
    pub fn backend<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut lock(&self.shared))
    }

    /// Forget every issued session token
    pub fn revoke_sessions(&self) {
        self.backend(|b| b.tokens.clear());
    }

    /// Contexts opened so far, oldest first
    pub fn contexts(&self) -> Vec<MockDriver> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently opened context
    pub fn latest(&self) -> MockDriver {
        self.contexts().pop().expect("no context opened yet")
    }

    /// A context with no session applied
    pub fn anonymous(&self) -> MockDriver {
        let driver = MockDriver::new();
        wire(&driver, &self.shared);
        driver
    }
}

#[async_trait]
impl DriverFactory for Workshop {
    async fn open(&self) -> HarnessResult<Arc<dyn Driver>> {
        let driver = MockDriver::new();
        wire(&driver, &self.shared);
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(driver.clone());
        Ok(Arc::new(driver))
    }
}

/// Run config pointed at the scripted application with every bound at `ms`
pub fn config(ms: u64) -> Arc<RunConfig> {
    Arc::new(
        RunConfig::new()
            .with_base_url(BASE_URL)
            .with_credentials(Credentials::new(USERNAME, PASSWORD))
            .with_timeouts(Timeouts::uniform(ms))
            .with_retries(1),
    )
}

/// Session cache logging in through the scripted login form
pub fn sessions(workshop: &Workshop, config: &Arc<RunConfig>) -> SessionCache<UiAuthenticator> {
    SessionCache::new(UiAuthenticator::new(
        Arc::new(workshop.clone()),
        Arc::clone(config),
    ))
}

/// Scenario with every workflow alias registered
pub async fn begin(
    workshop: &Workshop,
    sessions: &SessionCache<UiAuthenticator>,
    config: &Arc<RunConfig>,
) -> Scenario {
    let _ = init_tracing("workshop_harness=warn", LogFormat::Pretty);
    Scenario::begin(
        workshop,
        sessions,
        Arc::clone(config),
        endpoints::all_rules().unwrap(),
    )
    .await
    .unwrap()
}

// =============================================================================
// ROUTING
// =============================================================================

fn wire(driver: &MockDriver, shared: &Shared) {
    driver.with_dom(|dom| {
        dom.insert(MockElement::new(NOTIFICATIONS, "div"));
        reset_page(dom);

        let s = Arc::clone(shared);
        dom.on_navigate(LOGIN_PATH, move |fx| render_login(fx.dom, &s));

        let s = Arc::clone(shared);
        dom.on_navigate(DASHBOARD_PATH, move |fx| {
            if signed_in(fx, &s) {
                render_dashboard(fx.dom, &s);
            }
        });

        let s = Arc::clone(shared);
        dom.on_navigate(JOBS_PATH, move |fx| {
            if !signed_in(fx, &s) {
                return;
            }
            let path = url_path(fx.dom.url()).trim_end_matches('/').to_string();
            match path.strip_prefix(&format!("{JOBS_PATH}/")) {
                Some(id) => {
                    if let Ok(id) = id.parse() {
                        show_job(fx, &s, id);
                    }
                }
                None => show_job_list(fx, &s),
            }
        });

        let s = Arc::clone(shared);
        dom.on_navigate(PARTS_PATH, move |fx| {
            if !signed_in(fx, &s) {
                return;
            }
            let path = url_path(fx.dom.url()).trim_end_matches('/').to_string();
            match path.strip_prefix(&format!("{PARTS_PATH}/")) {
                Some(id) => {
                    if let Ok(id) = id.parse() {
                        show_part(fx, &s, id);
                    }
                }
                None => show_parts_list(fx, &s),
            }
        });
    });
}

/// Redirects to the login page unless the context carries a live token
fn signed_in(fx: &mut MockEffects<'_>, shared: &Shared) -> bool {
    let live = {
        let app = lock(shared);
        fx.dom
            .cookies()
            .iter()
            .any(|c| c.name == SESSION_COOKIE && app.tokens.contains(&c.value))
    };
    if !live {
        fx.dom.set_url(url(LOGIN_PATH));
        render_login(fx.dom, shared);
    }
    live
}

fn reset_page(dom: &mut MockDom) {
    dom.remove(PAGE);
    dom.remove(OVERLAY);
    dom.insert(MockElement::new(PAGE, "div"));
    dom.insert(MockElement::new(OVERLAY, "div"));
}

fn notify(fx: &mut MockEffects<'_>, text: &str) {
    let id = format!(
        "notification-{}",
        NEXT_NOTIFICATION.fetch_add(1, Ordering::SeqCst)
    );
    fx.dom.remove(NOTIFICATIONS);
    fx.dom.insert(MockElement::new(NOTIFICATIONS, "div"));
    fx.dom.insert(
        MockElement::new(&id, "div")
            .matching(css::NOTIFICATION)
            .within(NOTIFICATIONS)
            .with_text(text),
    );
    fx.later(NOTIFICATION_TTL, move |fx| fx.dom.remove(&id));
}

fn show_spinner(dom: &mut MockDom) {
    dom.insert(
        MockElement::new("spinner", "div")
            .matching(css::SPINNER)
            .within(OVERLAY),
    );
}

fn is_checked(dom: &MockDom, id: &str) -> bool {
    dom.element(id)
        .and_then(|e| e.attributes.get("class"))
        .is_some_and(|class| class.contains("ant-checkbox-wrapper-checked"))
}

fn toggle_checkbox(dom: &mut MockDom, id: &str) {
    let checked = is_checked(dom, id);
    if let Some(e) = dom.element_mut(id) {
        let class = if checked { CHECKBOX } else { CHECKBOX_CHECKED };
        let _ = e.attributes.insert("class".to_string(), class.to_string());
    }
}

fn checkbox(id: &str, css: &str, parent: &str) -> MockElement {
    MockElement::new(id, "label")
        .matching(css)
        .within(parent)
        .with_attribute("class", CHECKBOX)
}

fn field(id: &str, css: &str, parent: &str, value: &str) -> MockElement {
    MockElement::new(id, "input")
        .matching(css)
        .within(parent)
        .with_value(value)
}

// =============================================================================
// LOGIN AND SHELL
// =============================================================================

fn render_login(dom: &mut MockDom, shared: &Shared) {
    reset_page(dom);
    dom.remove(MENU);
    dom.insert(
        field("login-username", css::USERNAME, PAGE, "").with_attribute("type", "email"),
    );
    dom.insert(
        field("login-password", css::PASSWORD, PAGE, "").with_attribute("type", "password"),
    );
    dom.insert(
        MockElement::new("login-submit", "button")
            .matching("button")
            .within(PAGE)
            .with_text("Log In"),
    );
    let s = Arc::clone(shared);
    dom.on_click("login-submit", move |fx| submit_login(fx, &s));
}

fn submit_login(fx: &mut MockEffects<'_>, shared: &Shared) {
    let username = fx.dom.value("login-username").unwrap_or_default();
    let password = fx.dom.value("login-password").unwrap_or_default();
    let token = {
        let mut app = lock(shared);
        if app.credentials.username == username && app.credentials.password == password {
            app.logins += 1;
            let token = format!("session-{}", app.logins);
            app.tokens.push(token.clone());
            Some(token)
        } else {
            None
        }
    };
    match token {
        Some(token) => {
            fx.call(HttpMethod::Post, api("auth/login"), 200);
            fx.dom
                .set_cookie(Cookie::new(SESSION_COOKIE, token, HOST).http_only());
            fx.dom.set_url(url(DASHBOARD_PATH));
            render_dashboard(fx.dom, shared);
        }
        None => {
            fx.call(HttpMethod::Post, api("auth/login"), 401);
            notify(fx, "Invalid username or password.");
        }
    }
}

fn render_shell(dom: &mut MockDom, shared: &Shared) {
    if dom.contains(MENU) {
        return;
    }
    dom.insert(MockElement::new(MENU, "ul"));
    dom.insert(
        MockElement::new("menu-inventory", "span")
            .matching(css::INVENTORY_MENU)
            .within(MENU)
            .with_text("Inventory"),
    );
    dom.insert(
        MockElement::new("menu-parts", "li")
            .matching(css::PARTS_MENU_ITEM)
            .within(MENU)
            .with_text("Parts")
            .hidden(),
    );
    dom.on_click("menu-inventory", |fx| {
        let open = fx.dom.element("menu-parts").is_some_and(|e| e.visible);
        fx.dom.set_visible("menu-parts", !open);
    });
    let s = Arc::clone(shared);
    dom.on_click("menu-parts", move |fx| {
        fx.dom.set_url(url(PARTS_PATH));
        show_parts_list(fx, &s);
    });
}

fn render_dashboard(dom: &mut MockDom, shared: &Shared) {
    reset_page(dom);
    render_shell(dom, shared);
    dom.insert(
        MockElement::new("dashboard-title", "h1")
            .within(PAGE)
            .with_text("Dashboard"),
    );
}

// =============================================================================
// JOBS
// =============================================================================

fn show_job_list(fx: &mut MockEffects<'_>, shared: &Shared) {
    fx.call(HttpMethod::Get, api("job-mgmt/odata/jobindex?$top=25&$skip=0"), 200);
    let app = lock(shared);
    render_job_list(fx.dom, shared, &app);
}

fn render_job_list(dom: &mut MockDom, shared: &Shared, app: &Backend) {
    reset_page(dom);
    render_shell(dom, shared);
    dom.insert(
        MockElement::new("bulk-print", "button")
            .matching(css::BULK_PRINT)
            .within(PAGE)
            .with_text("Print"),
    );
    dom.insert(MockElement::new("job-table", "tbody").within(PAGE));
    for (index, job) in app.jobs.iter().enumerate() {
        let row = format!("job-row-{index}");
        dom.insert(MockElement::new(&row, "tr").matching(css::JOB_ROW).within("job-table"));
        for column in 0..JOB_COLUMNS {
            let text = match column {
                2 => format!("{} {}", job.customer.first_name, job.customer.last_name),
                3 => "In Progress".to_string(),
                _ => String::new(),
            };
            dom.insert(
                MockElement::new(format!("{row}-cell-{column}"), "td")
                    .matching("td")
                    .within(&row)
                    .with_text(text),
            );
        }
        let check = format!("job-check-{index}");
        dom.insert(checkbox(&check, css::JOB_CHECKBOX, &format!("{row}-cell-0")));
        let id = check.clone();
        dom.on_click(&check, move |fx| toggle_checkbox(fx.dom, &id));

        let link = format!("job-link-{index}");
        dom.insert(
            MockElement::new(&link, "a")
                .matching("a")
                .within(format!("{row}-cell-1"))
                .with_text(format!("JOB-{}", job.id)),
        );
        let s = Arc::clone(shared);
        let job_id = job.id;
        dom.on_click(&link, move |fx| {
            fx.dom.set_url(url(&format!("{JOBS_PATH}/{job_id}")));
            show_job(fx, &s, job_id);
        });

        if job.printed {
            insert_printed_icon(dom, index);
        }
    }
    let s = Arc::clone(shared);
    dom.on_click("bulk-print", move |fx| print_checked(fx, &s));
}

fn insert_printed_icon(dom: &mut MockDom, index: usize) {
    let cell = format!("job-row-{index}-cell-{PRINTED_COLUMN}");
    if dom.contains(&cell) {
        dom.insert(
            MockElement::new(format!("job-printed-{index}"), "span")
                .matching(css::PRINTED_ICON)
                .within(cell)
                .with_attribute("aria-label", "printed"),
        );
    }
}

fn print_checked(fx: &mut MockEffects<'_>, shared: &Shared) {
    let (checked, delay) = {
        let mut app = lock(shared);
        let checked: Vec<usize> = (0..app.jobs.len())
            .filter(|i| is_checked(fx.dom, &format!("job-check-{i}")))
            .collect();
        if checked.is_empty() {
            return;
        }
        for &index in &checked {
            app.jobs[index].printed = true;
        }
        (checked, app.print_delay)
    };
    fx.call(HttpMethod::Post, api("job-mgmt/jobs/print"), 200);
    fx.later(delay, move |fx| {
        for index in checked {
            insert_printed_icon(fx.dom, index);
        }
    });
}

fn show_job(fx: &mut MockEffects<'_>, shared: &Shared, id: u32) {
    fx.call(HttpMethod::Get, api(&format!("job-mgmt/jobs/{id}")), 200);
    let app = lock(shared);
    if let Some(job) = app.job(id) {
        render_job(fx.dom, shared, job);
    }
}

fn render_job(dom: &mut MockDom, shared: &Shared, job: &Job) {
    reset_page(dom);
    render_shell(dom, shared);
    dom.insert(
        MockElement::new("job-heading", "h1")
            .within(PAGE)
            .with_text(format!("JOB-{}", job.id)),
    );
    dom.insert(
        MockElement::new("view-more", "a")
            .matching("a")
            .within(PAGE)
            .with_text("View More"),
    );
    dom.insert(
        MockElement::new("more-actions", "button")
            .matching("button")
            .within(PAGE)
            .with_text("More Actions"),
    );
    dom.insert(MockElement::new("customer-section", "section").within(PAGE).hidden());
    dom.insert(
        MockElement::new("customer-name", "span")
            .within("customer-section")
            .with_text(format!("{} {}", job.customer.first_name, job.customer.last_name)),
    );
    dom.insert(
        MockElement::new("customer-actions", "button")
            .matching(css::CUSTOMER_ACTIONS)
            .within("customer-section"),
    );
    dom.insert(
        MockElement::new("edit-customer", "li")
            .matching(css::DROPDOWN_ITEM)
            .within("customer-section")
            .with_text("Edit Customer Details")
            .hidden(),
    );

    dom.on_click("view-more", |fx| fx.dom.set_visible("customer-section", true));
    dom.on_click("customer-actions", |fx| fx.dom.set_visible("edit-customer", true));
    let s = Arc::clone(shared);
    let job_id = job.id;
    dom.on_click("edit-customer", move |fx| {
        fx.dom.set_visible("edit-customer", false);
        let app = lock(&s);
        if let Some(job) = app.job(job_id) {
            render_customer_modal(fx.dom, &s, job);
        }
    });
}

fn render_customer_modal(dom: &mut MockDom, shared: &Shared, job: &Job) {
    const MODAL: &str = "customer-modal";
    dom.insert(MockElement::new(MODAL, "div").matching(css::MODAL_WRAP).within(OVERLAY));
    let c = &job.customer;
    for (id, name, value) in [
        ("customer-first", "firstName", &c.first_name),
        ("customer-last", "lastName", &c.last_name),
        ("customer-mobile", "mobileNumber", &c.mobile_number),
        ("customer-phone", "phoneNumber", &c.phone_number),
        ("customer-email", "email", &c.email),
    ] {
        dom.insert(
            field(id, &format!(r#"input[name$="{name}"]"#), MODAL, value)
                .with_attribute("name", format!("customer.{name}")),
        );
    }
    dom.insert(
        MockElement::new("customer-save", "button")
            .matching("button")
            .within(MODAL)
            .with_text("Save"),
    );
    let s = Arc::clone(shared);
    let job_id = job.id;
    dom.on_click("customer-save", move |fx| save_customer(fx, &s, job_id));
}

fn save_customer(fx: &mut MockEffects<'_>, shared: &Shared, job_id: u32) {
    let read = |id: &str| fx.dom.value(id).unwrap_or_default();
    let edited = Customer {
        id: 0,
        first_name: read("customer-first"),
        last_name: read("customer-last"),
        mobile_number: read("customer-mobile"),
        phone_number: read("customer-phone"),
        email: read("customer-email"),
    };
    if edited.first_name.is_empty() || edited.mobile_number.is_empty() {
        notify(fx, "Please complete the required fields.");
        return;
    }
    let (customer_id, status, refetch, delay, early) = {
        let mut app = lock(shared);
        let status = app.customer_update_status;
        let (refetch, delay) = (app.refetch_after_update, app.refetch_delay);
        let early = app.early_success;
        let Some(job) = app.jobs.iter_mut().find(|j| j.id == job_id) else {
            return;
        };
        let customer_id = job.customer.id;
        if (200..300).contains(&status) {
            job.customer = Customer {
                id: customer_id,
                ..edited.clone()
            };
        }
        (customer_id, status, refetch, delay, early)
    };

    fx.call(
        HttpMethod::Patch,
        api(&format!("job-mgmt/customers/{customer_id}")),
        status,
    );
    if !(200..300).contains(&status) {
        notify(fx, "Failed to update customer details.");
        return;
    }
    if refetch {
        fx.call_delayed(
            HttpMethod::Get,
            api(&format!("job-mgmt/jobs/{job_id}")),
            200,
            delay,
        );
    }
    let name = format!("{} {}", edited.first_name, edited.last_name);
    if early {
        fx.dom.remove("customer-modal");
        fx.dom.set_text("customer-name", name);
        notify(fx, "Customer details updated successfully.");
        return;
    }
    fx.later(delay, move |fx| {
        fx.dom.remove("customer-modal");
        fx.dom.set_text("customer-name", name);
    });
}

// =============================================================================
// PARTS
// =============================================================================

fn show_parts_list(fx: &mut MockEffects<'_>, shared: &Shared) {
    fx.call(HttpMethod::Get, api("inventory/parts"), 200);
    let app = lock(shared);
    render_parts_list(fx.dom, shared, &app);
}

fn render_main(dom: &mut MockDom, shared: &Shared) {
    reset_page(dom);
    render_shell(dom, shared);
    dom.insert(MockElement::new("main", "main").matching(css::MAIN).within(PAGE));
}

fn render_parts_list(dom: &mut MockDom, shared: &Shared, app: &Backend) {
    render_main(dom, shared);
    dom.insert(
        MockElement::new("new-part", "button")
            .matching(css::NEW_ENTITY)
            .within("main")
            .with_text("New Part"),
    );
    dom.insert(
        MockElement::new("merge-button", "button")
            .matching("button")
            .within("main")
            .with_text("Merge"),
    );
    dom.insert(
        MockElement::new("parts-body", "tbody")
            .matching(css::TABLE_BODY)
            .within("main"),
    );
    for part in &app.parts {
        let row = format!("part-row-{}", part.id);
        dom.insert(MockElement::new(&row, "tr").matching(css::TABLE_ROW).within("parts-body"));

        let select = format!("{row}-select");
        dom.insert(MockElement::new(&select, "td").within(&row));
        let check = format!("part-check-{}", part.id);
        dom.insert(checkbox(&check, css::ROW_CHECKBOX, &select));
        let id = check.clone();
        dom.on_click(&check, move |fx| toggle_checkbox(fx.dom, &id));

        let code_cell = format!("{row}-code");
        dom.insert(MockElement::new(&code_cell, "td").within(&row));
        let link = format!("part-link-{}", part.id);
        dom.insert(
            MockElement::new(&link, "a")
                .matching("a")
                .within(&code_cell)
                .with_text(&part.code),
        );
        let s = Arc::clone(shared);
        let part_id = part.id;
        dom.on_click(&link, move |fx| {
            fx.dom.set_url(url(&format!("{PARTS_PATH}/{part_id}")));
            show_part(fx, &s, part_id);
        });

        dom.insert(
            MockElement::new(format!("{row}-description"), "td")
                .within(&row)
                .with_text(&part.description),
        );
        let quantity_cell = format!("{row}-quantity");
        dom.insert(MockElement::new(&quantity_cell, "td").within(&row));
        dom.insert(
            MockElement::new(format!("part-quantity-{}", part.id), "div")
                .matching(css::ROW_QUANTITY)
                .within(&quantity_cell)
                .with_text(part.on_hand.to_string()),
        );
    }

    let s = Arc::clone(shared);
    dom.on_click("merge-button", move |fx| open_merge(fx, &s));
    let s = Arc::clone(shared);
    dom.on_click("new-part", move |fx| render_part_form(fx.dom, &s));
}

fn render_part_form(dom: &mut MockDom, shared: &Shared) {
    const FORM: &str = "part-form";
    reset_page(dom);
    dom.insert(MockElement::new(FORM, "div").matching(css::FORM_WRAPPER).within(PAGE));
    for (id, placeholder) in [
        ("form-code", "Part No/Code"),
        ("form-description", "Description"),
        ("form-barcode", "Barcode"),
    ] {
        dom.insert(
            field(id, &format!(r#"input[placeholder="{placeholder}"]"#), FORM, "")
                .with_attribute("placeholder", placeholder),
        );
    }
    dom.insert(
        MockElement::new("form-stocked", "span")
            .matching(css::STOCKED)
            .within(FORM)
            .with_text("Stocked")
            .with_attribute("data-checked", "false"),
    );
    dom.insert(
        MockElement::new("form-save", "button")
            .matching("button")
            .within(FORM)
            .with_text("Save"),
    );
    dom.on_click("form-stocked", |fx| {
        if let Some(e) = fx.dom.element_mut("form-stocked") {
            let checked = e.attributes.get("data-checked").is_some_and(|v| v == "true");
            let _ = e
                .attributes
                .insert("data-checked".to_string(), (!checked).to_string());
        }
    });
    let s = Arc::clone(shared);
    dom.on_click("form-save", move |fx| save_part(fx, &s));
}

fn save_part(fx: &mut MockEffects<'_>, shared: &Shared) {
    let code = fx.dom.value("form-code").unwrap_or_default();
    let description = fx.dom.value("form-description").unwrap_or_default();
    let barcode = fx.dom.value("form-barcode").unwrap_or_default();
    let stocked = fx
        .dom
        .element("form-stocked")
        .and_then(|e| e.attributes.get("data-checked"))
        .is_some_and(|v| v == "true");
    if code.trim().is_empty() {
        notify(fx, "Part No/Code is required.");
        return;
    }
    let created = {
        let mut app = lock(shared);
        if app.part_by_code(&code).is_some() {
            None
        } else {
            let id = app.next_part_id;
            app.next_part_id += 1;
            app.parts.push(Part {
                id,
                code,
                description,
                barcode,
                stocked,
                on_hand: Quantity::ZERO,
                history: Vec::new(),
            });
            Some(id)
        }
    };
    match created {
        Some(id) => {
            fx.call(HttpMethod::Post, api("inventory/parts"), 201);
            fx.dom.set_url(url(&format!("{PARTS_PATH}/{id}")));
            show_part(fx, shared, id);
        }
        None => {
            fx.call(HttpMethod::Post, api("inventory/parts"), 409);
            notify(fx, "A part with this code already exists.");
        }
    }
}

fn show_part(fx: &mut MockEffects<'_>, shared: &Shared, id: u32) {
    fx.call(HttpMethod::Get, api(&format!("inventory/parts/{id}")), 200);
    let app = lock(shared);
    if let Some(part) = app.part(id) {
        render_part(fx.dom, shared, part, app.stale_history_row);
    }
}

fn render_part(dom: &mut MockDom, shared: &Shared, part: &Part, stale_row: bool) {
    render_main(dom, shared);
    dom.insert(MockElement::new("details-card", "div").within("main"));
    dom.insert(
        MockElement::new("details-title", "div")
            .matching(css::CARD_TITLE)
            .within("details-card")
            .with_text("Part Details"),
    );
    dom.insert(
        MockElement::new("details-code", "span")
            .within("details-card")
            .with_text(&part.code),
    );
    dom.insert(
        MockElement::new("details-on-hand", "span")
            .within("details-card")
            .with_text(part.on_hand.to_string()),
    );
    dom.insert(
        MockElement::new("adjust-stock", "button")
            .matching(css::ADJUST_STOCK)
            .within("details-card")
            .with_text("Adjust Stock"),
    );

    dom.insert(MockElement::new("history-card", "div").within("main"));
    dom.insert(
        MockElement::new("history-title", "div")
            .matching(css::CARD_TITLE)
            .within("history-card")
            .with_text("Part History"),
    );
    dom.insert(
        MockElement::new("history-body", "tbody")
            .matching(css::HISTORY_BODY)
            .within("history-card"),
    );
    if stale_row {
        const STALE: &str = "history-row-stale";
        dom.insert(
            MockElement::new(STALE, "tr")
                .matching(css::TABLE_ROW)
                .within("history-body")
                .hidden(),
        );
        let cells = ["Stock Adjustment", "01/01/2020", "99.00", "99.00"];
        for (c, text) in cells.into_iter().enumerate() {
            dom.insert(
                MockElement::new(format!("{STALE}-cell-{c}"), "td")
                    .matching("td")
                    .within(STALE)
                    .with_text(text),
            );
        }
    }
    for (n, entry) in part.history.iter().enumerate() {
        let row = format!("history-row-{n}");
        dom.insert(MockElement::new(&row, "tr").matching(css::TABLE_ROW).within("history-body"));
        let cells = [
            entry.kind.clone(),
            "17/10/2026".to_string(),
            entry.quantity.to_string(),
            entry.on_hand.to_string(),
            String::new(),
            String::new(),
            USERNAME.to_string(),
            entry.notes.clone(),
        ];
        for (c, text) in cells.into_iter().enumerate() {
            dom.insert(
                MockElement::new(format!("{row}-cell-{c}"), "td")
                    .matching("td")
                    .within(&row)
                    .with_text(text),
            );
        }
    }

    let s = Arc::clone(shared);
    let part_id = part.id;
    dom.on_click("adjust-stock", move |fx| render_stock_modal(fx.dom, &s, part_id));
}

fn render_stock_modal(dom: &mut MockDom, shared: &Shared, part_id: u32) {
    const MODAL: &str = "stock-modal";
    dom.insert(MockElement::new(MODAL, "div").matching(css::MODAL).within(OVERLAY));
    dom.insert(field("stock-delta", css::DELTA, MODAL, DELTA_DEFAULT));
    dom.insert(field("stock-notes", css::NOTES, MODAL, ""));
    dom.insert(
        MockElement::new("stock-confirm", "button")
            .matching("button")
            .within(MODAL)
            .with_text("Confirm"),
    );
    let s = Arc::clone(shared);
    dom.on_click("stock-confirm", move |fx| confirm_adjustment(fx, &s, part_id));
}

fn confirm_adjustment(fx: &mut MockEffects<'_>, shared: &Shared, part_id: u32) {
    let raw = fx.dom.value("stock-delta").unwrap_or_default();
    let typed = raw.strip_prefix(DELTA_DEFAULT).filter(|t| !t.is_empty()).unwrap_or(raw.as_str());
    let Ok(delta) = Quantity::parse(typed) else {
        notify(fx, "Enter a valid quantity.");
        return;
    };
    let notes = fx.dom.value("stock-notes").unwrap_or_default();
    {
        let mut app = lock(shared);
        let Some(part) = app.parts.iter_mut().find(|p| p.id == part_id) else {
            return;
        };
        part.on_hand = part.on_hand + delta;
        let on_hand = part.on_hand;
        part.history.insert(
            0,
            HistoryEntry {
                kind: "Stock Adjustment".to_string(),
                quantity: delta,
                on_hand,
                notes,
            },
        );
    }
    fx.call(
        HttpMethod::Patch,
        api(&format!("inventory/parts/{part_id}/stock")),
        200,
    );
    notify(fx, "Stock level updated successfully.");
    let app = lock(shared);
    if let Some(part) = app.part(part_id) {
        render_part(fx.dom, shared, part, app.stale_history_row);
    }
}

// =============================================================================
// MERGE
// =============================================================================

fn open_merge(fx: &mut MockEffects<'_>, shared: &Shared) {
    const MODAL: &str = "merge-modal";
    let chosen: Vec<(u32, String, Quantity)> = {
        let app = lock(shared);
        app.parts
            .iter()
            .filter(|p| is_checked(fx.dom, &format!("part-check-{}", p.id)))
            .map(|p| (p.id, p.code.clone(), p.on_hand))
            .collect()
    };
    if chosen.len() != 2 {
        notify(fx, "Select exactly two parts to merge.");
        return;
    }
    let dom = &mut *fx.dom;
    dom.insert(MockElement::new(MODAL, "div").matching(css::MODAL).within(OVERLAY));
    dom.insert(MockElement::new("merge-row", "div").within(MODAL));
    for (side, (_, code, on_hand)) in chosen.iter().enumerate() {
        let column = format!("merge-column-{side}");
        let card = format!("merge-card-{side}");
        dom.insert(MockElement::new(&column, "div").matching(css::MERGE_COLUMN).within("merge-row"));
        dom.insert(MockElement::new(&card, "div").matching(css::CARD_BODY).within(&column));
        dom.insert(
            MockElement::new(format!("merge-code-{side}"), "span")
                .matching(css::CODE_LABEL)
                .within(&card)
                .with_attribute("aria-label", code)
                .with_text(code),
        );
        dom.insert(
            MockElement::new(format!("merge-on-hand-{side}"), "span")
                .within(&card)
                .with_text(on_hand.to_string()),
        );
        dom.on_click(&card, move |fx| {
            if let Some(modal) = fx.dom.element_mut(MODAL) {
                let _ = modal
                    .attributes
                    .insert("data-survivor".to_string(), side.to_string());
            }
            if let Some(submit) = fx.dom.element_mut("merge-submit") {
                submit.enabled = true;
            }
        });
    }
    dom.insert(
        MockElement::new("merge-submit", "button")
            .matching("button")
            .within(MODAL)
            .with_text("Merge & Delete")
            .disabled(),
    );
    let ids = [chosen[0].0, chosen[1].0];
    let codes = [chosen[0].1.clone(), chosen[1].1.clone()];
    let s = Arc::clone(shared);
    dom.on_click("merge-submit", move |fx| {
        let survivor = fx
            .dom
            .element(MODAL)
            .and_then(|m| m.attributes.get("data-survivor"))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let deleted = 1 - survivor;
        render_merge_confirm(fx.dom, &s, (ids[survivor], ids[deleted]), &codes[survivor], &codes[deleted]);
    });
}

fn render_merge_confirm(
    dom: &mut MockDom,
    shared: &Shared,
    (survivor, deleted): (u32, u32),
    survivor_code: &str,
    deleted_code: &str,
) {
    dom.insert(MockElement::new("merge-confirm", "div").within(OVERLAY));
    dom.insert(
        MockElement::new("merge-warning", "div")
            .matching(css::WARNING)
            .within("merge-confirm")
            .with_text(format!(
                "Are you sure you want to merge these two parts?\nThis will delete {deleted_code} and move its stock to {survivor_code}."
            )),
    );
    dom.insert(
        MockElement::new("merge-proceed", "button")
            .matching(css::PROCEED)
            .within("merge-confirm")
            .with_text("Proceed"),
    );
    let s = Arc::clone(shared);
    dom.on_click("merge-proceed", move |fx| proceed_merge(fx, &s, survivor, deleted));
}

fn proceed_merge(fx: &mut MockEffects<'_>, shared: &Shared, survivor: u32, deleted: u32) {
    let (status, delay) = {
        let app = lock(shared);
        (app.merge_status, app.merge_delay)
    };
    show_spinner(fx.dom);
    fx.call_delayed(HttpMethod::Post, api("inventory/parts/merge"), status, delay);
    let s = Arc::clone(shared);
    fx.later(delay, move |fx| {
        fx.dom.remove("spinner");
        if !(200..300).contains(&status) {
            notify(fx, "Parts could not be merged.");
            return;
        }
        {
            let mut app = lock(&s);
            if let Some(gone) = app.part(deleted).cloned() {
                app.parts.retain(|p| p.id != deleted);
                if let Some(kept) = app.parts.iter_mut().find(|p| p.id == survivor) {
                    kept.on_hand = kept.on_hand + gone.on_hand;
                    let on_hand = kept.on_hand;
                    kept.history.insert(
                        0,
                        HistoryEntry {
                            kind: "Stock Adjustment".to_string(),
                            quantity: gone.on_hand,
                            on_hand,
                            notes: format!("Merged from part number {}", gone.code),
                        },
                    );
                }
            }
        }
        notify(fx, "Parts merged successfully.");
        let app = lock(&s);
        render_parts_list(fx.dom, &s, &app);
    });
}
