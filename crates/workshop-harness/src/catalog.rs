//! Version 1 selector catalogs for the workshop application.
//!
//! The application renders Ant Design components; most lookups target the
//! stable `ut-*` test ids where the app has them and fall back to component
//! classes plus visible text where it does not.

use crate::selector::{Selector, SelectorCatalog};

/// Catalog version shipped with this crate
pub const VERSION: u32 = 1;

/// Roles present in every screen catalog
pub mod shell {
    /// Loading spinner overlay
    pub const SPINNER: &str = "loading spinner";
    /// Toast notification body
    pub const NOTIFICATION: &str = "notification";
    /// Any open modal
    pub const MODAL: &str = "modal";
}

/// Login screen roles
pub mod login {
    /// Username or email input
    pub const USERNAME: &str = "username field";
    /// Password input
    pub const PASSWORD: &str = "password field";
    /// Submit button
    pub const SUBMIT: &str = "login button";
}

/// Job list roles
pub mod job_list {
    /// First data row of the job table
    pub const FIRST_ROW: &str = "first job row";
    /// Link into the job from a row
    pub const ROW_LINK: &str = "job link";
    /// Row selection checkbox wrapper; the real input is hidden
    pub const ROW_CHECKBOX: &str = "job checkbox";
    /// Bulk print action
    pub const PRINT_BUTTON: &str = "print button";
    /// Cells of a row
    pub const ROW_CELL: &str = "job cell";
    /// Printed marker icon
    pub const PRINTED_ICON: &str = "printed icon";
}

/// Job detail roles
pub mod job_detail {
    /// Expands the customer panel
    pub const VIEW_MORE: &str = "view more link";
    /// Customer actions trigger
    pub const CUSTOMER_ACTIONS: &str = "customer actions button";
    /// Dropdown entry opening the customer modal
    pub const EDIT_CUSTOMER: &str = "edit customer details item";
    /// Job-level actions trigger
    pub const MORE_ACTIONS: &str = "more actions button";
}

/// Customer details modal roles
pub mod customer_details {
    /// Modal container
    pub const CONTAINER: &str = "customer modal";
    /// First name input
    pub const FIRST_NAME: &str = "first name field";
    /// Last name input
    pub const LAST_NAME: &str = "last name field";
    /// Mobile input
    pub const MOBILE: &str = "mobile field";
    /// Landline input
    pub const PHONE: &str = "phone field";
    /// Email input
    pub const EMAIL: &str = "email field";
    /// Save button
    pub const SAVE: &str = "save button";
}

/// Parts list and part detail roles
pub mod parts_list {
    /// Inventory group in the side menu
    pub const INVENTORY_MENU: &str = "inventory menu";
    /// Parts list entry in the side menu
    pub const PARTS_MENU_ITEM: &str = "parts list menu item";
    /// Create-part action
    pub const NEW_PART: &str = "new part button";
    /// Merge action for two selected rows
    pub const MERGE: &str = "merge button";
    /// Main content area
    pub const MAIN: &str = "main content";
    /// Parts table body
    pub const TABLE_BODY: &str = "parts table body";
    /// Data row of the parts table
    pub const ROW: &str = "part row";
    /// Row selection checkbox label
    pub const ROW_CHECKBOX: &str = "part checkbox";
    /// On-hand quantity cell of a row
    pub const ROW_QUANTITY: &str = "part quantity";
    /// Link opening a part by its code
    pub const PART_LINK: &str = "part link";
    /// Part details heading
    pub const DETAILS_HEADING: &str = "part details heading";
    /// Adjust-stock action on the part details view
    pub const ADJUST_STOCK: &str = "adjust stock button";
    /// Part history heading
    pub const HISTORY_HEADING: &str = "part history heading";
    /// Part history table body
    pub const HISTORY_BODY: &str = "part history table";
    /// Row of the history table
    pub const HISTORY_ROW: &str = "history row";
    /// Cell of a history row
    pub const HISTORY_CELL: &str = "history cell";
}

/// Part form roles
pub mod part_form {
    /// Form card wrapper
    pub const WRAPPER: &str = "part form";
    /// Part code input
    pub const CODE: &str = "part code field";
    /// Description input
    pub const DESCRIPTION: &str = "description field";
    /// Barcode input
    pub const BARCODE: &str = "barcode field";
    /// Stocked checkbox label
    pub const STOCKED: &str = "stocked checkbox";
    /// Save button
    pub const SAVE: &str = "save button";
}

/// Stock adjustment modal roles
pub mod stock_adjustment {
    /// Quantity delta input
    pub const DELTA: &str = "delta field";
    /// Notes input
    pub const NOTES: &str = "notes field";
    /// Confirm button
    pub const CONFIRM: &str = "confirm button";
}

/// Merge modal roles
pub mod merge_modal {
    /// Column holding one part card (0 = left, 1 = right)
    pub const COLUMN: &str = "part column";
    /// Card body inside a column
    pub const CARD: &str = "part card";
    /// Part code label carrying the code in `aria-label`
    pub const CODE_LABEL: &str = "part code label";
    /// Merge & Delete button
    pub const MERGE_AND_DELETE: &str = "merge and delete button";
    /// Consequence warning text
    pub const WARNING: &str = "merge warning";
    /// Popconfirm primary button
    pub const PROCEED: &str = "proceed button";
}

/// Roles every screen shares
#[must_use]
pub fn shell_v1() -> SelectorCatalog {
    SelectorCatalog::new("shell", VERSION)
        .with(Selector::css(shell::SPINNER, ".ant-spin-spinning").first())
        .with(Selector::css(shell::NOTIFICATION, ".ant-notification-notice-description").first())
        .with(Selector::css(shell::MODAL, ".ant-modal").first())
}

/// Login form
#[must_use]
pub fn login_v1() -> SelectorCatalog {
    SelectorCatalog::new("login", VERSION)
        .with(
            Selector::css(
                login::USERNAME,
                r#"input[type="email"], input[name="username"], input[autocomplete="username"]"#,
            )
            .first(),
        )
        .with(
            Selector::css(
                login::PASSWORD,
                r#"input[type="password"], input[name="password"], input[autocomplete="current-password"]"#,
            )
            .first(),
        )
        .with(Selector::css(login::SUBMIT, "button").matching_text(r"log\s*in"))
        .include(&shell_v1())
}

/// Job list table
#[must_use]
pub fn job_list_v1() -> SelectorCatalog {
    let first_row = Selector::css(
        job_list::FIRST_ROW,
        r#"tbody tr:not(.ant-table-measure-row):not([aria-hidden="true"])"#,
    )
    .first();
    SelectorCatalog::new("job-list", VERSION)
        .with(first_row.clone())
        .with(Selector::css(job_list::ROW_LINK, "a").within(first_row.clone()).first())
        .with(
            Selector::css(job_list::ROW_CHECKBOX, "label.ant-checkbox-wrapper")
                .within(first_row.clone())
                .first(),
        )
        .with(Selector::css(job_list::PRINT_BUTTON, "#ut-list-bulk-print"))
        .with(Selector::css(job_list::ROW_CELL, "td").within(first_row))
        .with(Selector::css(job_list::PRINTED_ICON, r#"span[aria-label="printed"]"#))
        .include(&shell_v1())
}

/// Job detail view
#[must_use]
pub fn job_detail_v1() -> SelectorCatalog {
    SelectorCatalog::new("job-detail", VERSION)
        .with(Selector::css(job_detail::VIEW_MORE, "a").containing("View More"))
        .with(Selector::css(job_detail::CUSTOMER_ACTIONS, "#customer-more-action > .ant-btn").first())
        .with(
            Selector::css(job_detail::EDIT_CUSTOMER, ".ant-dropdown-menu-item")
                .containing("Edit Customer Details"),
        )
        .with(Selector::css(job_detail::MORE_ACTIONS, "button").containing("More Actions"))
        .include(&shell_v1())
}

/// Customer details modal
#[must_use]
pub fn customer_details_v1() -> SelectorCatalog {
    let container = Selector::css(customer_details::CONTAINER, "div.ant-modal-wrap");
    let field = |role: &str, name: &str| {
        Selector::css(role, format!(r#"input[name$="{name}"]"#)).within(container.clone())
    };
    SelectorCatalog::new("customer-details", VERSION)
        .with(container.clone())
        .with(field(customer_details::FIRST_NAME, "firstName"))
        .with(field(customer_details::LAST_NAME, "lastName"))
        .with(field(customer_details::MOBILE, "mobileNumber"))
        .with(field(customer_details::PHONE, "phoneNumber"))
        .with(field(customer_details::EMAIL, "email"))
        .with(
            Selector::css(customer_details::SAVE, "button")
                .containing("Save")
                .within(container.clone()),
        )
        .include(&shell_v1())
}

/// Parts list, part details and part history
#[must_use]
pub fn parts_list_v1() -> SelectorCatalog {
    let main = Selector::css(parts_list::MAIN, "main.ant-layout-content");
    let table_body =
        Selector::css(parts_list::TABLE_BODY, "tbody.ant-table-tbody").within(main.clone());
    let row = Selector::css(parts_list::ROW, "tr.ant-table-row").within(table_body.clone());
    let history_body =
        Selector::css(parts_list::HISTORY_BODY, ".ant-table-tbody").containing("Stock Adjustment");
    let history_row =
        Selector::css(parts_list::HISTORY_ROW, "tr.ant-table-row").within(history_body.clone());
    SelectorCatalog::new("parts-list", VERSION)
        .with(Selector::css(
            parts_list::INVENTORY_MENU,
            r#"li[id="ut-side-menu-group-inventory"] span[class="ant-menu-title-content"]"#,
        ))
        .with(Selector::css(parts_list::PARTS_MENU_ITEM, "#ut-side-menu-part-list"))
        .with(Selector::css(parts_list::NEW_PART, "#ut-list-add-entity-button"))
        .with(Selector::css(parts_list::MERGE, "button").containing("Merge").within(main.clone()))
        .with(main.clone())
        .with(table_body)
        .with(row.clone())
        .with(Selector::css(
            parts_list::ROW_CHECKBOX,
            "td.ant-table-selection-column label.ant-checkbox-wrapper",
        ))
        .with(Selector::css(parts_list::ROW_QUANTITY, "td div.text-right").first())
        .with(Selector::css(parts_list::PART_LINK, "a").within(main))
        .with(
            Selector::css(parts_list::DETAILS_HEADING, ".ant-card-head-title")
                .containing("Part Details")
                .first(),
        )
        .with(Selector::css(parts_list::ADJUST_STOCK, "#ut-adjust-stock"))
        .with(
            Selector::css(parts_list::HISTORY_HEADING, ".ant-card-head-title")
                .containing("Part History"),
        )
        .with(history_body)
        .with(history_row)
        .with(Selector::css(parts_list::HISTORY_CELL, "td"))
        .include(&shell_v1())
}

/// New/edit part form
#[must_use]
pub fn part_form_v1() -> SelectorCatalog {
    let wrapper = Selector::css(part_form::WRAPPER, ".page-form-card-wrapper");
    let input = |role: &str, placeholder: &str| {
        Selector::css(role, format!(r#"input[placeholder="{placeholder}"]"#)).within(wrapper.clone())
    };
    SelectorCatalog::new("part-form", VERSION)
        .with(wrapper.clone())
        .with(input(part_form::CODE, "Part No/Code"))
        .with(input(part_form::DESCRIPTION, "Description"))
        .with(input(part_form::BARCODE, "Barcode"))
        .with(Selector::css(part_form::STOCKED, ".ant-checkbox-label").first())
        .with(Selector::css(part_form::SAVE, "button").containing("Save").within(wrapper))
        .include(&shell_v1())
}

/// Stock adjustment modal
#[must_use]
pub fn stock_adjustment_v1() -> SelectorCatalog {
    SelectorCatalog::new("stock-adjustment", VERSION)
        .with(Selector::css(
            stock_adjustment::DELTA,
            "input[name='stockAdjustment.delta']",
        ))
        .with(Selector::css(
            stock_adjustment::NOTES,
            "input[name='stockAdjustment.notes']",
        ))
        .with(Selector::css(stock_adjustment::CONFIRM, "button").containing("Confirm"))
        .include(&shell_v1())
}

/// Merge parts modal
#[must_use]
pub fn merge_modal_v1() -> SelectorCatalog {
    let modal = Selector::css(shell::MODAL, ".ant-modal").first();
    SelectorCatalog::new("merge-modal", VERSION)
        .with(Selector::css(merge_modal::COLUMN, ".ant-row .ant-col").within(modal.clone()))
        .with(Selector::css(merge_modal::CARD, ".ant-card-body"))
        .with(
            Selector::css(merge_modal::CODE_LABEL, "span.ant-typography[aria-label]")
                .within(modal.clone()),
        )
        .with(
            Selector::css(merge_modal::MERGE_AND_DELETE, "button")
                .containing("Merge & Delete")
                .within(modal),
        )
        .with(Selector::css(merge_modal::WARNING, ".with-line-breaks"))
        .with(Selector::css(
            merge_modal::PROCEED,
            ".ant-popconfirm-buttons > .ant-btn-primary",
        ))
        .include(&shell_v1())
}
