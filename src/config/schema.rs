use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::scores::DEFAULT_TIERS;
use crate::store::{RetryPolicy, SheetRange};

pub const DEFAULT_SUMMARY_SHEET: &str = "Summary";
pub const DEFAULT_SCORE_SHEET: &str = "Score";
pub const DEFAULT_ROSTER_RANGE: &str = "Sheet1!A:F";

/// Top-level configuration.
///
/// Example YAML:
/// ```yaml
/// summary_spreadsheet_id: "1snk..."
/// classes:
///   "Class 4": "1E3T..."
///   "Class 5": "1k20..."
/// ranking:
///   tiers: 3
/// retry:
///   attempts: 3
///   initial_delay: 100ms
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Spreadsheet holding the cross-class summary table
    #[serde(default)]
    pub summary_spreadsheet_id: Option<String>,

    #[serde(default = "default_summary_sheet")]
    pub summary_sheet: String,

    /// Per-class score table name
    #[serde(default = "default_score_sheet")]
    pub score_sheet: String,

    /// Where each class spreadsheet keeps its project roster
    #[serde(default = "default_roster_range")]
    pub roster_range: String,

    /// Class name to spreadsheet id. An empty id marks the class as not set up yet.
    #[serde(default)]
    pub classes: BTreeMap<String, String>,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RankingConfig {
    /// Number of rank tiers kept per class
    #[serde(default = "default_tiers")]
    pub tiers: usize,
}

/// Retry settings for store calls. Durations use humantime syntax ("250ms", "2s").
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    #[serde(default = "default_initial_delay")]
    pub initial_delay: String,

    #[serde(default = "default_max_delay")]
    pub max_delay: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sheets,
    File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Directory of JSON workbooks (file store)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Sheets API base URL (sheets store)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_summary_sheet() -> String {
    DEFAULT_SUMMARY_SHEET.to_string()
}

fn default_score_sheet() -> String {
    DEFAULT_SCORE_SHEET.to_string()
}

fn default_roster_range() -> String {
    DEFAULT_ROSTER_RANGE.to_string()
}

fn default_tiers() -> usize {
    DEFAULT_TIERS
}

fn default_attempts() -> usize {
    3
}

fn default_initial_delay() -> String {
    "100ms".to_string()
}

fn default_max_delay() -> String {
    "5s".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            summary_spreadsheet_id: None,
            summary_sheet: default_summary_sheet(),
            score_sheet: default_score_sheet(),
            roster_range: default_roster_range(),
            classes: BTreeMap::new(),
            ranking: RankingConfig::default(),
            retry: RetryConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryConfig {
    /// Resolve the humantime strings into a retry policy
    pub fn policy(&self) -> anyhow::Result<RetryPolicy> {
        let parse = |field: &str, value: &str| -> anyhow::Result<Duration> {
            humantime::parse_duration(value)
                .map_err(|e| anyhow::anyhow!("retry.{}: invalid duration '{}' - {}", field, value, e))
        };
        Ok(RetryPolicy {
            attempts: self.attempts,
            initial_delay: parse("initial_delay", &self.initial_delay)?,
            max_delay: parse("max_delay", &self.max_delay)?,
        })
    }
}

impl Config {
    /// Summary spreadsheet id, if set and non-blank
    pub fn summary_spreadsheet(&self) -> Option<&str> {
        self.summary_spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Spreadsheet id for a class, if configured and non-blank
    pub fn class_spreadsheet(&self, class_name: &str) -> Option<&str> {
        self.classes
            .get(class_name)
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
    }

    pub fn roster(&self) -> anyhow::Result<SheetRange> {
        SheetRange::parse(&self.roster_range)
    }
}
