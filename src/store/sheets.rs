use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{table_width, Grid, SheetRange, TabularStore};
use crate::error::StoreError;

pub const DEFAULT_ENDPOINT: &str = "https://sheets.googleapis.com/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Sheets v4 REST client authenticated with an OAuth access token
pub struct SheetsClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchValueRanges {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

impl SheetsClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        let base = Url::parse(endpoint.trim_end_matches('/'))
            .with_context(|| format!("Invalid Sheets endpoint: {}", endpoint))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid Sheets endpoint: {}", endpoint);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("judgebook/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base,
            token: token.to_string(),
        })
    }

    /// `<base>/spreadsheets/<id><suffix>` followed by `segments`
    fn url(&self, spreadsheet_id: &str, suffix: &str, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("spreadsheets")
                .push(&format!("{}{}", spreadsheet_id, suffix));
            path.extend(segments);
        }
        url
    }

    /// `values/<range>?valueInputOption=RAW` for overwriting a block
    fn write_url(&self, spreadsheet_id: &str, range: &SheetRange) -> Url {
        let mut url = self.url(spreadsheet_id, "", &["values", &range.to_a1()]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        url
    }

    fn clear_url(&self, spreadsheet_id: &str, range: &SheetRange) -> Url {
        let a1 = format!("{}:clear", range.to_a1());
        self.url(spreadsheet_id, "", &["values", &a1])
    }

    /// Append below the last row of the table, inserting rows
    fn append_url(&self, spreadsheet_id: &str, sheet: &str, width: usize) -> Url {
        let columns = SheetRange::columns(sheet, 0, width.max(1) - 1);
        let a1 = format!("{}:append", columns.to_a1());
        let mut url = self.url(spreadsheet_id, "", &["values", &a1]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        url
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, StoreError> {
        tracing::debug!(%method, %url, "sheets request");
        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), StoreError> {
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send(Method::POST, self.url(spreadsheet_id, ":batchUpdate", &[]), Some(body))
            .await?;
        tracing::info!(spreadsheet = spreadsheet_id, sheet = title, "created sheet");
        Ok(())
    }

    /// Create `sheet` with `header` as its first row unless it already exists
    async fn ensure_sheet(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
    ) -> Result<(), StoreError> {
        let titles = self.sheet_titles(spreadsheet_id).await?;
        if titles.iter().any(|t| t == sheet) {
            return Ok(());
        }
        self.add_sheet(spreadsheet_id, sheet).await?;
        if !header.is_empty() {
            let range = SheetRange::block(sheet, header.len(), 1);
            self.write_values(spreadsheet_id, &range, &[header.to_vec()]).await?;
        }
        Ok(())
    }

    async fn write_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let url = self.write_url(spreadsheet_id, range);
        let body = json!({ "range": range.to_a1(), "majorDimension": "ROWS", "values": rows });
        self.send(Method::PUT, url, Some(body)).await?;
        Ok(())
    }

    async fn clear(&self, spreadsheet_id: &str, range: &SheetRange) -> Result<(), StoreError> {
        self.send(Method::POST, self.clear_url(spreadsheet_id, range), Some(json!({})))
            .await?;
        Ok(())
    }
}

/// Everything below the header row, `width` columns wide
fn body_range(sheet: &str, width: usize) -> SheetRange {
    SheetRange::columns(sheet, 0, width.max(1) - 1).starting_at_row(1)
}

/// The block `rows` body rows occupy, from row 2 down
fn body_block(sheet: &str, width: usize, rows: usize) -> SheetRange {
    SheetRange::block(sheet, width, rows + 1).starting_at_row(1)
}

/// Map a failed HTTP status onto the store error taxonomy
fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(detail),
        // Reading a sheet that does not exist
        StatusCode::BAD_REQUEST if body.contains("Unable to parse range") => StoreError::NotFound(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => StoreError::Transient(detail),
        s if s.is_server_error() => StoreError::Transient(detail),
        _ => StoreError::Rejected(detail),
    }
}

/// Sheets returns numbers and booleans as JSON scalars when unformatted
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

fn into_grid(values: Vec<Vec<Value>>) -> Grid {
    values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, StoreError> {
        let mut url = self.url(spreadsheet_id, "", &[]);
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let meta: SpreadsheetMeta = decode(self.send(Method::GET, url, None).await?)?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn read_range(&self, spreadsheet_id: &str, range: &SheetRange) -> Result<Grid, StoreError> {
        let url = self.url(spreadsheet_id, "", &["values", &range.to_a1()]);
        let values: ValueRange = decode(self.send(Method::GET, url, None).await?)?;
        Ok(into_grid(values.values))
    }

    async fn batch_read(
        &self,
        spreadsheet_id: &str,
        ranges: &[SheetRange],
    ) -> Result<Vec<Grid>, StoreError> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.url(spreadsheet_id, "", &["values:batchGet"]);
        {
            let mut query = url.query_pairs_mut();
            for range in ranges {
                query.append_pair("ranges", &range.to_a1());
            }
        }
        let batch: BatchValueRanges = decode(self.send(Method::GET, url, None).await?)?;
        if batch.value_ranges.len() != ranges.len() {
            return Err(StoreError::Malformed(format!(
                "asked for {} ranges, got {}",
                ranges.len(),
                batch.value_ranges.len()
            )));
        }
        Ok(batch
            .value_ranges
            .into_iter()
            .map(|vr| into_grid(vr.values))
            .collect())
    }

    async fn replace_table(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        self.ensure_sheet(spreadsheet_id, sheet, header).await?;

        let width = table_width(header, rows);
        self.clear(spreadsheet_id, &body_range(sheet, width)).await?;

        if !rows.is_empty() {
            let target = body_block(sheet, width, rows.len());
            self.write_values(spreadsheet_id, &target, rows).await?;
        }
        Ok(())
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        self.ensure_sheet(spreadsheet_id, sheet, header).await?;
        if rows.is_empty() {
            return Ok(());
        }

        let url = self.append_url(spreadsheet_id, sheet, table_width(header, rows));
        self.send(Method::POST, url, Some(json!({ "values": rows })))
            .await?;
        Ok(())
    }
}
