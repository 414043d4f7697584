use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::parse::{is_header, records_from_grid};
use crate::store::layout;

/// A project as listed in the class roster
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RosterProject {
    pub project_id: String,
    pub title: String,
    pub theme: String,
    /// Unique, sorted
    pub student_names: Vec<String>,
}

/// Reduce roster rows (header included) to one entry per project id.
///
/// The first row of a project sets its title and theme; every row adds its
/// student. Rows without a project id are ignored.
pub fn reduce_roster(grid: &[Vec<String>]) -> BTreeMap<String, RosterProject> {
    let mut projects: BTreeMap<String, (RosterProject, BTreeSet<String>)> = BTreeMap::new();

    for (position, record) in records_from_grid(grid, &layout::ROSTER_COLUMNS).iter().enumerate() {
        if is_header(record, position) {
            continue;
        }
        let get = |col: &str| record.get(col).map(|s| s.trim()).unwrap_or("").to_string();

        let project_id = get(layout::PROJECT_ID);
        if project_id.is_empty() {
            continue;
        }

        let (_, names) = projects.entry(project_id.clone()).or_insert_with(|| {
            (
                RosterProject {
                    project_id,
                    title: get(layout::PROJECT_TITLE),
                    theme: get(layout::THEME),
                    student_names: Vec::new(),
                },
                BTreeSet::new(),
            )
        });

        let student = get(layout::STUDENT_NAME);
        if !student.is_empty() {
            names.insert(student);
        }
    }

    projects
        .into_iter()
        .map(|(id, (mut project, names))| {
            project.student_names = names.into_iter().collect();
            (id, project)
        })
        .collect()
}
