use serde::Serialize;

use super::aggregate::format_average;
use super::rank::RankedProject;
use crate::store::layout::PROJECT_ID_LABEL;

/// One row of the cross-class summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSummaryEntry {
    pub standard: String,
    pub rank: u32,
    pub project_id: String,
    pub project_title: String,
    pub theme: String,
    pub average: f64,
    pub student_names: String,
}

impl From<&RankedProject> for AdminSummaryEntry {
    fn from(ranked: &RankedProject) -> Self {
        Self {
            standard: ranked.standard.clone(),
            rank: ranked.rank,
            project_id: ranked.record.project_id.clone(),
            project_title: ranked.record.title.clone(),
            theme: ranked.record.theme.clone(),
            average: ranked.average,
            student_names: ranked.record.student_list(),
        }
    }
}

impl AdminSummaryEntry {
    /// Summary table cells: standard, rank, id, title, theme, average, students
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.standard.clone(),
            self.rank.to_string(),
            self.project_id.clone(),
            self.project_title.clone(),
            self.theme.clone(),
            format_average(self.average),
            self.student_names.clone(),
        ]
    }

    /// Read a summary table row back. Returns `None` for the header and rows without a project id.
    pub fn from_row(row: &[String]) -> Option<Self> {
        let get = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");
        let project_id = get(2);
        if project_id.is_empty() || project_id.eq_ignore_ascii_case(PROJECT_ID_LABEL) {
            return None;
        }
        Some(Self {
            standard: get(0).to_string(),
            rank: get(1).parse().unwrap_or(0),
            project_id: project_id.to_string(),
            project_title: get(3).to_string(),
            theme: get(4).to_string(),
            average: get(5).parse().unwrap_or(0.0),
            student_names: get(6).to_string(),
        })
    }
}

/// Merge per-class top lists into one summary ordered by class label, then rank.
///
/// Class labels compare lexically, so "Class 10" sorts before "Class 4".
/// Entries with the same class and rank keep their input order.
pub fn merge_rankings<I>(rankings: I) -> Vec<AdminSummaryEntry>
where
    I: IntoIterator<Item = Vec<RankedProject>>,
{
    let mut entries: Vec<AdminSummaryEntry> = rankings
        .into_iter()
        .flatten()
        .map(|ranked| AdminSummaryEntry::from(&ranked))
        .collect();

    entries.sort_by(|a, b| a.standard.cmp(&b.standard).then(a.rank.cmp(&b.rank)));
    entries
}
