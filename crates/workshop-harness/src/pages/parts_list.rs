use super::{MergePartsModal, PageObject, PartFormPage, StockAdjustmentModal};
use crate::capability::{Clickable, Navigable, Readable, Surface, Waitable};
use crate::catalog::{self, parts_list};
use crate::quantity::Quantity;
use crate::result::{HarnessError, HarnessResult};
use crate::selector::Selector;

/// Route of the parts list
pub const PARTS_PATH: &str = "/inventory/parts";

/// One row of the part history table, cell texts trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Cell texts in column order
    pub cells: Vec<String>,
}

impl HistoryRow {
    fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map_or("", String::as_str)
    }

    /// Movement type column
    #[must_use]
    pub fn kind(&self) -> &str {
        self.cell(0)
    }

    /// Quantity moved column
    #[must_use]
    pub fn quantity(&self) -> &str {
        self.cell(2)
    }

    /// Quantity on hand column
    #[must_use]
    pub fn on_hand(&self) -> &str {
        self.cell(3)
    }

    /// Notes column
    #[must_use]
    pub fn notes(&self) -> &str {
        self.cell(7)
    }
}

/// Parts list, with the part details and history views it leads to
#[derive(Debug, Clone)]
pub struct PartsListPage {
    surface: Surface,
}

impl PageObject for PartsListPage {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn url_pattern(&self) -> Option<&str> {
        Some(PARTS_PATH)
    }
}

impl Waitable for PartsListPage {}
impl Clickable for PartsListPage {}
impl Readable for PartsListPage {}
impl Navigable for PartsListPage {}

impl PartsListPage {
    /// Parts list over `surface`'s driver
    #[must_use]
    pub fn new(surface: &Surface) -> Self {
        Self {
            surface: surface.for_screen(catalog::parts_list_v1()),
        }
    }

    /// Visit the parts route and wait for the table
    pub async fn open(&self) -> HarnessResult<()> {
        self.visit(PARTS_PATH).await?;
        self.wait_loaded().await
    }

    /// Reach the list through Inventory > Parts in the side menu
    pub async fn open_from_menu(&self) -> HarnessResult<()> {
        self.click(&self.selector(parts_list::INVENTORY_MENU)?)
            .await?;
        self.return_to_list().await
    }

    /// Click the Parts menu entry; the Inventory group must already be open
    pub async fn return_to_list(&self) -> HarnessResult<()> {
        self.click(&self.selector(parts_list::PARTS_MENU_ITEM)?)
            .await?;
        self.wait_loaded().await
    }

    /// Spinner gone and the table body rendered
    pub async fn wait_loaded(&self) -> HarnessResult<()> {
        self.wait_for_loading().await?;
        let _ = self
            .wait_visible(&self.selector(parts_list::TABLE_BODY)?)
            .await?;
        Ok(())
    }

    /// Open the new-part form
    pub async fn start_new_part(&self) -> HarnessResult<PartFormPage> {
        self.click(&self.selector(parts_list::NEW_PART)?).await?;
        let form = PartFormPage::new(&self.surface);
        form.wait_open().await?;
        Ok(form)
    }

    /// Open a part by its code and wait for its details
    pub async fn open_part(&self, code: &str) -> HarnessResult<()> {
        let link = self.selector(parts_list::PART_LINK)?.containing(code).first();
        self.click(&link).await?;
        self.wait_for_details().await
    }

    /// Part details heading visible
    pub async fn wait_for_details(&self) -> HarnessResult<()> {
        let _ = self
            .wait_visible(&self.selector(parts_list::DETAILS_HEADING)?)
            .await?;
        Ok(())
    }

    fn row(&self, index: usize) -> HarnessResult<Selector> {
        Ok(self
            .selector(parts_list::ROW)?
            .nth(index)
            .as_role(format!("part row {index}")))
    }

    /// Visible rows in the table
    pub async fn row_count(&self) -> HarnessResult<usize> {
        self.count_visible(&self.selector(parts_list::ROW)?).await
    }

    /// On-hand quantity shown in a row
    pub async fn row_quantity(&self, index: usize) -> HarnessResult<Quantity> {
        let cell = self
            .selector(parts_list::ROW_QUANTITY)?
            .within(self.row(index)?);
        let text = self.read_text(&cell).await?;
        Quantity::parse(&text)
    }

    /// Tick the checkbox of each row
    pub async fn select_rows(&self, indices: &[usize]) -> HarnessResult<()> {
        for &index in indices {
            let row = self.row(index)?;
            let _ = self.wait_visible(&row).await?;
            let checkbox = self.selector(parts_list::ROW_CHECKBOX)?.within(row);
            self.click(&checkbox).await?;
        }
        Ok(())
    }

    /// Press Merge and wait for the merge modal
    pub async fn request_merge(&self) -> HarnessResult<MergePartsModal> {
        self.click(&self.selector(parts_list::MERGE)?).await?;
        let modal = MergePartsModal::new(&self.surface);
        modal.wait_open().await?;
        Ok(modal)
    }

    /// Press Adjust Stock on the part details view
    pub async fn open_stock_adjustment(&self) -> HarnessResult<StockAdjustmentModal> {
        self.wait_for_details().await?;
        self.click(&self.selector(parts_list::ADJUST_STOCK)?)
            .await?;
        let modal = StockAdjustmentModal::new(&self.surface);
        modal.wait_open().await?;
        Ok(modal)
    }

    /// Part details, then the history heading and its table
    pub async fn wait_for_part_history(&self) -> HarnessResult<()> {
        let history = self.surface.timeouts().history();
        self.wait_for_details().await?;
        self.wait_for_loading().await?;
        let _ = self
            .wait_visible_within(&self.selector(parts_list::HISTORY_HEADING)?, history)
            .await?;
        let _ = self
            .wait_visible_within(&self.selector(parts_list::HISTORY_BODY)?, history)
            .await?;
        Ok(())
    }

    /// Rows of the part history table, newest first
    pub async fn history_rows(&self) -> HarnessResult<Vec<HistoryRow>> {
        let rows = self.selector(parts_list::HISTORY_ROW)?;
        let candidates = match rows.find_all(self.surface.driver()).await {
            Ok(found) => found,
            Err(HarnessError::SelectorNotFound { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        // cells are read by candidate index, so hidden rows keep their slot
        let visible: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, row)| row.visible)
            .map(|(index, _)| index)
            .collect();
        let mut out = Vec::with_capacity(visible.len());
        for index in visible {
            let row = rows.clone().nth(index).as_role(format!("history row {index}"));
            let cells = self
                .read_all_text(&self.selector(parts_list::HISTORY_CELL)?.within(row))
                .await?;
            out.push(HistoryRow { cells });
        }
        Ok(out)
    }
}
