use std::collections::BTreeMap;

use super::types::{Attendance, CriterionScores, ScoreRow, ThemeFit};
use crate::store::layout::{self, PROJECT_ID_LABEL};

/// One untyped table row: canonical column name -> cell text
pub type RawRecord = BTreeMap<String, String>;

/// Lowest and highest score a judge can give for a criterion
pub const SCORE_RANGE: (f64, f64) = (0.0, 10.0);

/// Turn a positional grid into records keyed by column name.
///
/// Missing trailing cells become empty strings; cells beyond `columns` are dropped.
pub fn records_from_grid(grid: &[Vec<String>], columns: &[&str]) -> Vec<RawRecord> {
    grid.iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| (col.to_string(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

fn cell<'a>(record: &'a RawRecord, column: &str) -> &'a str {
    record.get(column).map(|s| s.trim()).unwrap_or("")
}

/// True for the header row or a header repeated mid-table
pub fn is_header(record: &RawRecord, position: usize) -> bool {
    position == 0 || cell(record, layout::PROJECT_ID).eq_ignore_ascii_case(PROJECT_ID_LABEL)
}

/// Parse a criterion cell. Blank, unparsable, or out-of-range values are `None`.
pub fn parse_score(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let value: f64 = s.parse().ok()?;
    if !value.is_finite() || value < SCORE_RANGE.0 || value > SCORE_RANGE.1 {
        return None;
    }
    Some(value)
}

fn parse_criterion(record: &RawRecord, column: &str, position: usize) -> Option<f64> {
    let raw = cell(record, column);
    let parsed = parse_score(raw);
    if parsed.is_none() && !raw.is_empty() {
        tracing::debug!(row = position, column, value = raw, "ignoring invalid score");
    }
    parsed
}

/// Parse one judge-table record. Returns `None` for headers and rows without a project id.
pub fn parse_score_row(record: &RawRecord, position: usize) -> Option<ScoreRow> {
    if is_header(record, position) {
        return None;
    }

    let project_id = cell(record, layout::PROJECT_ID);
    if project_id.is_empty() {
        tracing::debug!(row = position, "skipping score row without project id");
        return None;
    }

    Some(ScoreRow {
        serial: cell(record, layout::SERIAL).to_string(),
        student_name: cell(record, layout::STUDENT_NAME).to_string(),
        grade: cell(record, layout::GRADE).to_string(),
        project_title: cell(record, layout::PROJECT_TITLE).to_string(),
        project_id: project_id.to_string(),
        scores: CriterionScores {
            creativity: parse_criterion(record, layout::CREATIVITY, position),
            scientific_thought: parse_criterion(record, layout::SCIENTIFIC_THOUGHT, position),
            technical_skills: parse_criterion(record, layout::TECHNICAL_SKILLS, position),
            presentation: parse_criterion(record, layout::PRESENTATION, position),
        },
        status: Attendance::parse(cell(record, layout::STATUS)),
        theme_fit: ThemeFit::parse(cell(record, layout::THEME_FIT)),
    })
}

/// Parse a whole judge table (header included) in append order
pub fn parse_judge_table(grid: &[Vec<String>]) -> Vec<ScoreRow> {
    records_from_grid(grid, &layout::JUDGE_COLUMNS)
        .iter()
        .enumerate()
        .filter_map(|(position, record)| parse_score_row(record, position))
        .collect()
}

/// Render a score row back into judge-table cells (columns A-K)
pub fn score_row_cells(row: &ScoreRow) -> Vec<String> {
    let score = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    vec![
        row.serial.clone(),
        row.student_name.clone(),
        row.grade.clone(),
        row.project_title.clone(),
        row.project_id.clone(),
        score(row.scores.creativity),
        score(row.scores.scientific_thought),
        score(row.scores.technical_skills),
        score(row.scores.presentation),
        row.status.as_str().to_string(),
        row.theme_fit.map(|t| t.as_str().to_string()).unwrap_or_default(),
    ]
}
