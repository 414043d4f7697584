use std::collections::BTreeMap;

use super::types::ScoreRow;

/// project id -> (judge name -> that judge's latest row)
pub type JudgedScores = BTreeMap<String, BTreeMap<String, ScoreRow>>;

/// Keep one row per project for a single judge.
///
/// Judge tables are append-only, so `rows` must be in append order: the last
/// row seen for a project is the judge's latest submission and replaces any
/// earlier one.
pub fn latest_by_project<I>(rows: I) -> BTreeMap<String, ScoreRow>
where
    I: IntoIterator<Item = ScoreRow>,
{
    let mut latest = BTreeMap::new();
    for row in rows {
        latest.insert(row.project_id.clone(), row);
    }
    latest
}

/// Fold independently reduced judges into one project -> judge mapping
pub fn merge_judges<I>(judges: I) -> JudgedScores
where
    I: IntoIterator<Item = (String, BTreeMap<String, ScoreRow>)>,
{
    let mut merged: JudgedScores = BTreeMap::new();
    for (judge, projects) in judges {
        for (project_id, row) in projects {
            merged.entry(project_id).or_default().insert(judge.clone(), row);
        }
    }
    merged
}
