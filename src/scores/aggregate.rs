use std::collections::{BTreeMap, BTreeSet};

use super::reduce::JudgedScores;
use super::roster::RosterProject;
use super::types::{Attendance, CriterionScores, ScoreRow};

/// Aggregated judging state of one project within a class
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub class_name: String,
    pub project_id: String,
    pub title: String,
    pub theme: String,
    pub student_names: Vec<String>,
    /// Per-criterion sums over judges who marked the project present
    pub sums: CriterionScores<f64>,
    /// Judges who marked the project present
    pub judge_count: u32,
    /// Judges who marked the project absent
    pub absent_count: u32,
    /// False when the project was scored but is missing from the roster
    pub in_roster: bool,
}

impl ProjectRecord {
    fn from_roster(class_name: &str, project: &RosterProject) -> Self {
        Self {
            class_name: class_name.to_string(),
            project_id: project.project_id.clone(),
            title: project.title.clone(),
            theme: project.theme.clone(),
            student_names: project.student_names.clone(),
            sums: CriterionScores::default(),
            judge_count: 0,
            absent_count: 0,
            in_roster: true,
        }
    }

    /// Minimal record for a project only known from judge tables
    fn orphan(class_name: &str, project_id: &str, judges: &BTreeMap<String, ScoreRow>) -> Self {
        let title = judges
            .values()
            .next()
            .map(|row| row.project_title.clone())
            .unwrap_or_default();
        let student_names: BTreeSet<String> = judges
            .values()
            .map(|row| row.student_name.clone())
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            class_name: class_name.to_string(),
            project_id: project_id.to_string(),
            title,
            theme: String::new(),
            student_names: student_names.into_iter().collect(),
            sums: CriterionScores::default(),
            judge_count: 0,
            absent_count: 0,
            in_roster: false,
        }
    }

    /// Count one judge's latest row. A blank criterion from a present judge counts as zero.
    pub fn record_judge(&mut self, row: &ScoreRow) {
        match row.status {
            Attendance::Absent => self.absent_count += 1,
            Attendance::Present => {
                self.judge_count += 1;
                self.sums.add_scores(&row.scores);
            }
        }
    }

    /// Per-criterion averages; all zero when no judge marked the project present
    pub fn averages(&self) -> CriterionScores<f64> {
        if self.judge_count == 0 {
            return CriterionScores::default();
        }
        let judges = f64::from(self.judge_count);
        self.sums.map(|sum| sum / judges)
    }

    /// Mean of the four criterion averages
    pub fn average(&self) -> f64 {
        self.averages().mean()
    }

    pub fn student_list(&self) -> String {
        self.student_names.join(", ")
    }

    /// Row for the per-class score table
    pub fn score_table_row(&self) -> Vec<String> {
        let averages = self.averages();
        let mut row = vec![self.project_id.clone(), self.title.clone(), self.theme.clone()];
        row.extend(averages.values().iter().map(|v| format_average(*v)));
        row.push(format_average(averages.mean()));
        row.push(self.student_list());
        row
    }
}

/// Two-decimal rendering used in every written table
pub fn format_average(value: f64) -> String {
    format!("{:.2}", value)
}

/// The value `format_average` publishes, read back as a number
pub fn published_average(value: f64) -> f64 {
    format_average(value).parse().unwrap_or(value)
}

/// Aggregate one class: every roster project plus every judged project, in project-id order.
pub fn aggregate_class(
    class_name: &str,
    roster: &BTreeMap<String, RosterProject>,
    judged: &JudgedScores,
) -> Vec<ProjectRecord> {
    let mut records: BTreeMap<String, ProjectRecord> = roster
        .iter()
        .map(|(id, project)| (id.clone(), ProjectRecord::from_roster(class_name, project)))
        .collect();

    for (project_id, judges) in judged {
        let record = records.entry(project_id.clone()).or_insert_with(|| {
            tracing::warn!(
                class = class_name,
                project = project_id.as_str(),
                "project scored by judges but missing from roster; student names may be incomplete"
            );
            ProjectRecord::orphan(class_name, project_id, judges)
        });

        for (judge, row) in judges {
            tracing::trace!(
                class = class_name,
                project = project_id.as_str(),
                judge = judge.as_str(),
                status = %row.status,
                "counting judge score"
            );
            record.record_judge(row);
        }
    }

    records.into_values().collect()
}
