//! Column layouts of the tables judgebook reads and writes.

use crate::store::range::SheetRange;

pub const SERIAL: &str = "serial";
pub const STUDENT_NAME: &str = "student_name";
pub const GRADE: &str = "grade";
pub const PROJECT_TITLE: &str = "project_title";
pub const PROJECT_ID: &str = "project_id";
pub const THEME: &str = "theme";
pub const CREATIVITY: &str = "creativity";
pub const SCIENTIFIC_THOUGHT: &str = "scientific_thought";
pub const TECHNICAL_SKILLS: &str = "technical_skills";
pub const PRESENTATION: &str = "presentation";
pub const STATUS: &str = "status";
pub const THEME_FIT: &str = "theme_fit";

/// Judge tables are named `Judge_<judge name>`
pub const JUDGE_SHEET_PREFIX: &str = "Judge_";

/// Roster columns A-F
pub const ROSTER_COLUMNS: [&str; 6] = [SERIAL, STUDENT_NAME, GRADE, PROJECT_TITLE, PROJECT_ID, THEME];

/// Judge table columns A-K
pub const JUDGE_COLUMNS: [&str; 11] = [
    SERIAL,
    STUDENT_NAME,
    GRADE,
    PROJECT_TITLE,
    PROJECT_ID,
    CREATIVITY,
    SCIENTIFIC_THOUGHT,
    TECHNICAL_SKILLS,
    PRESENTATION,
    STATUS,
    THEME_FIT,
];

pub const JUDGE_HEADER: [&str; 11] = [
    "S.No.",
    "Name of the Student",
    "Grade",
    "Project Title",
    "Project ID",
    "Creativity & Imagination",
    "Scientific Thought",
    "Technical Skills",
    "Presentation",
    "Status",
    "Theme Fit",
];

/// Header label of the project id column, shared by every table
pub const PROJECT_ID_LABEL: &str = "Project ID";

pub const SCORE_HEADER: [&str; 9] = [
    "Project ID",
    "Project Title",
    "Theme",
    "Avg Creativity",
    "Avg Scientific Thought",
    "Avg Technical Skills",
    "Avg Presentation",
    "Project Average Score",
    "Student Names",
];

pub const SUMMARY_HEADER: [&str; 7] = [
    "Standard",
    "Rank",
    "Project ID",
    "Project Title",
    "Theme",
    "Project Avg Score",
    "Student Names",
];

pub fn judge_sheet_name(judge: &str) -> String {
    format!("{}{}", JUDGE_SHEET_PREFIX, judge)
}

/// Judge name for a `Judge_*` sheet title, `None` for any other sheet
pub fn judge_name(sheet_title: &str) -> Option<&str> {
    sheet_title
        .strip_prefix(JUDGE_SHEET_PREFIX)
        .filter(|name| !name.trim().is_empty())
}

/// Full-column range covering a judge table
pub fn judge_range(sheet_title: &str) -> SheetRange {
    SheetRange::columns(sheet_title, 0, JUDGE_COLUMNS.len() - 1)
}

pub fn header_row(header: &[&str]) -> Vec<String> {
    header.iter().map(|h| h.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_name_from_sheet() {
        assert_eq!(judge_name("Judge_Alice"), Some("Alice"));
        assert_eq!(judge_name("Judge_Dr. Rao"), Some("Dr. Rao"));
        assert_eq!(judge_name("Judge_"), None);
        assert_eq!(judge_name("Score"), None);
        assert_eq!(judge_name("judge_alice"), None);
    }

    #[test]
    fn test_judge_range_spans_a_to_k() {
        assert_eq!(judge_range("Judge_Alice").to_a1(), "Judge_Alice!A:K");
        assert_eq!(judge_range("Judge_Dr Rao").to_a1(), "'Judge_Dr Rao'!A:K");
    }

    #[test]
    fn test_headers_match_columns() {
        assert_eq!(JUDGE_HEADER.len(), JUDGE_COLUMNS.len());
        assert_eq!(JUDGE_HEADER[4], PROJECT_ID_LABEL);
        assert_eq!(SCORE_HEADER[0], PROJECT_ID_LABEL);
    }
}
