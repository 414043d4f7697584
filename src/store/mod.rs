//! Access to the external tabular store (Google Sheets or local JSON workbooks).

pub mod file;
pub mod layout;
pub mod range;
pub mod retry;
pub mod sheets;

use async_trait::async_trait;

use crate::error::StoreError;

pub use file::FileStore;
pub use range::SheetRange;
pub use retry::{with_retry, RetryPolicy};
pub use sheets::SheetsClient;

/// Rows of cell text, as read from or written to a table
pub type Grid = Vec<Vec<String>>;

/// A spreadsheet-like store: spreadsheets hold named sheets of string cells.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Titles of all sheets in a spreadsheet, in sheet order
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, StoreError>;

    async fn read_range(&self, spreadsheet_id: &str, range: &SheetRange) -> Result<Grid, StoreError>;

    /// Read several ranges in one round trip; results follow the order of `ranges`
    async fn batch_read(
        &self,
        spreadsheet_id: &str,
        ranges: &[SheetRange],
    ) -> Result<Vec<Grid>, StoreError>;

    /// Replace everything below the header of `sheet`, creating the sheet with
    /// `header` when it does not exist yet
    async fn replace_table(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), StoreError>;

    /// Append rows after the last row of `sheet`, creating it with `header` first if needed
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), StoreError>;
}

/// Width of a table: the wider of the header and its rows
pub(crate) fn table_width(header: &[String], rows: &[Vec<String>]) -> usize {
    rows.iter()
        .map(|r| r.len())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Open the store selected in the configuration
pub fn open_store(
    config: &crate::config::StoreConfig,
    token: Option<&str>,
) -> anyhow::Result<Box<dyn TabularStore>> {
    use crate::config::StoreKind;

    match config.kind {
        StoreKind::Sheets => {
            let token = token.ok_or_else(|| {
                anyhow::anyhow!(
                    "No access token for Google Sheets. Set {}.",
                    crate::credentials::ENV_TOKEN_VAR
                )
            })?;
            let endpoint = config.endpoint.as_deref().unwrap_or(sheets::DEFAULT_ENDPOINT);
            Ok(Box::new(SheetsClient::new(endpoint, token)?))
        }
        StoreKind::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("store.path is required for the file store"))?;
            Ok(Box::new(FileStore::new(path)))
        }
    }
}
