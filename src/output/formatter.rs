use std::collections::BTreeMap;
use std::io::IsTerminal;

use chrono::Duration;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::pipeline::{ClassOutcome, ClassResult, RunReport, RunStatus};
use crate::scores::{score_row_cells, AdminSummaryEntry, RosterProject, ScoreRow};
use crate::store::layout::{self, JUDGE_HEADER};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate title to fit available width, accounting for Unicode
fn truncate_title(title: &str, max_width: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_width {
        title.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format an elapsed run time: "850ms", "2.4s", "1m 05s"
pub fn format_elapsed(duration: Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1_000.0)
    } else {
        let secs = millis / 1_000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// One line per class: name, state, and counts or the error
fn format_class_line(outcome: &ClassOutcome, name_width: usize, use_colors: bool) -> String {
    let name = format!("{:<width$}", outcome.class_name, width = name_width);
    let (state, detail) = match &outcome.result {
        ClassResult::Succeeded { judges, projects, ranked } => (
            "ok",
            format!("{} judges, {} projects, {} ranked", judges, projects, ranked),
        ),
        ClassResult::Unconfigured => ("skipped", "no spreadsheet configured".to_string()),
        ClassResult::Failed { error } => ("failed", error.clone()),
    };
    let state = format!("{:<7}", state);

    if use_colors {
        let state = match outcome.result {
            ClassResult::Succeeded { .. } => state.green().to_string(),
            ClassResult::Unconfigured => state.yellow().to_string(),
            ClassResult::Failed { .. } => state.red().to_string(),
        };
        format!("{}  {}  {}", name.bold(), state, detail)
    } else {
        format!("{}  {}  {}", name, state, detail)
    }
}

/// Format the cross-class summary as one line per ranked project
/// Columns: class, rank, average, project id, title, students
pub fn format_summary_table(entries: &[AdminSummaryEntry], use_colors: bool) -> String {
    format_summary_with_width(entries, use_colors, get_terminal_width())
}

fn format_summary_with_width(
    entries: &[AdminSummaryEntry],
    use_colors: bool,
    term_width: Option<usize>,
) -> String {
    if entries.is_empty() {
        return "No ranked projects.".to_string();
    }

    let class_width = entries.iter().map(|e| e.standard.chars().count()).max().unwrap_or(0);
    let id_width = entries.iter().map(|e| e.project_id.chars().count()).max().unwrap_or(0);
    let separator = "  ";

    entries
        .iter()
        .map(|entry| {
            let class = format!("{:<width$}", entry.standard, width = class_width);
            let rank = format!("#{}", entry.rank);
            let average = format!("{:>5.2}", entry.average);
            let id = format!("{:<width$}", entry.project_id, width = id_width);

            // Title and students share what is left of the line
            let fixed = class_width + 3 + 5 + id_width + separator.len() * 5 + entry.student_names.chars().count();
            let title = match term_width {
                Some(width) if width > fixed + 10 => truncate_title(&entry.project_title, width - fixed),
                Some(_) => truncate_title(&entry.project_title, 20),
                None => entry.project_title.clone(),
            };

            if use_colors {
                format!(
                    "{}{}{:<3}{}{}{}{}{}{}{}{}",
                    class.cyan(),
                    separator,
                    rank.bold(),
                    separator,
                    average.bold(),
                    separator,
                    id.dimmed(),
                    separator,
                    title,
                    separator,
                    entry.student_names.yellow()
                )
            } else {
                format!(
                    "{}{}{:<3}{}{}{}{}{}{}{}{}",
                    class,
                    separator,
                    rank,
                    separator,
                    average,
                    separator,
                    id,
                    separator,
                    title,
                    separator,
                    entry.student_names
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a whole run: class results, the summary, and a closing status line
pub fn format_run_report(report: &RunReport, use_colors: bool) -> String {
    let name_width = report
        .classes
        .iter()
        .map(|c| c.class_name.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines: Vec<String> = report
        .classes
        .iter()
        .map(|outcome| format_class_line(outcome, name_width, use_colors))
        .collect();

    lines.push(String::new());
    lines.push(format_summary_table(&report.summary, use_colors));
    lines.push(String::new());

    let elapsed = format_elapsed(report.finished_at - report.started_at);
    let status = match report.status {
        RunStatus::Complete => format!("All {} classes aggregated in {}", report.classes.len(), elapsed),
        RunStatus::Partial => format!(
            "{} of {} classes failed; summary covers the rest ({})",
            report.failed_classes().count(),
            report.classes.len(),
            elapsed
        ),
        RunStatus::Failed => "No class aggregated; summary table left unchanged".to_string(),
    };
    if use_colors {
        let status = match report.status {
            RunStatus::Complete => status.green().to_string(),
            RunStatus::Partial => status.yellow().to_string(),
            RunStatus::Failed => status.red().to_string(),
        };
        lines.push(status);
    } else {
        lines.push(status);
    }

    if let Some(error) = &report.summary_error {
        let line = format!("Summary table not written: {}", error);
        if use_colors {
            lines.push(line.red().to_string());
        } else {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Format table rows as tab-separated values for scripting (header row included)
pub fn format_tsv(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| row.join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a judge's saved rows as judge-table TSV, header first
pub fn format_judge_rows(rows: &[ScoreRow]) -> String {
    let mut table = vec![layout::header_row(&JUDGE_HEADER)];
    table.extend(rows.iter().map(score_row_cells));
    format_tsv(&table)
}

/// Format roster projects as one line each: id, title, theme, students
pub fn format_roster(projects: &[RosterProject], use_colors: bool) -> String {
    if projects.is_empty() {
        return "No projects found.".to_string();
    }

    let id_width = projects.iter().map(|p| p.project_id.chars().count()).max().unwrap_or(0);
    let title_width = projects.iter().map(|p| p.title.chars().count()).max().unwrap_or(0);
    projects
        .iter()
        .map(|project| {
            let id = format!("{:<width$}", project.project_id, width = id_width);
            let title = format!("{:<width$}", project.title, width = title_width);
            let students = project.student_names.join(", ");
            if use_colors {
                format!("{}  {}  {}  {}", id.bold(), title, project.theme.cyan(), students.yellow())
            } else {
                format!("{}  {}  {}  {}", id, title, project.theme, students)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format configured classes with their spreadsheet ids
pub fn format_class_list(classes: &BTreeMap<String, String>, use_colors: bool) -> String {
    if classes.is_empty() {
        return "No classes configured.".to_string();
    }

    let name_width = classes.keys().map(|c| c.chars().count()).max().unwrap_or(0);
    classes
        .iter()
        .map(|(name, id)| {
            let name = format!("{:<width$}", name, width = name_width);
            let id = id.trim();
            match (id.is_empty(), use_colors) {
                (true, true) => format!("{}  {}", name.bold(), "(not configured)".yellow()),
                (true, false) => format!("{}  (not configured)", name),
                (false, true) => format!("{}  {}", name.bold(), id.dimmed()),
                (false, false) => format!("{}  {}", name, id),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(class: &str, rank: u32, id: &str, title: &str, average: f64) -> AdminSummaryEntry {
        AdminSummaryEntry {
            standard: class.to_string(),
            rank,
            project_id: id.to_string(),
            project_title: title.to_string(),
            theme: "Energy".to_string(),
            average,
            student_names: "Asha, Ravi".to_string(),
        }
    }

    fn report(classes: Vec<ClassOutcome>, status: RunStatus) -> RunReport {
        let started_at = Utc::now();
        RunReport {
            started_at,
            finished_at: started_at + Duration::milliseconds(1500),
            status,
            classes,
            summary: vec![entry("Class 4", 1, "P1", "Solar Oven", 9.0)],
            summary_written: status != RunStatus::Failed,
            summary_error: None,
        }
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::milliseconds(850)), "850ms");
        assert_eq!(format_elapsed(Duration::milliseconds(2400)), "2.4s");
        assert_eq!(format_elapsed(Duration::seconds(65)), "1m 05s");
    }

    #[test]
    fn test_summary_table_empty() {
        assert_eq!(format_summary_table(&[], false), "No ranked projects.");
    }

    #[test]
    fn test_summary_table_aligns_columns() {
        let entries = vec![
            entry("Class 4", 1, "P1", "Solar Oven", 9.0),
            entry("Class 10", 2, "P12", "Water Filter", 8.5),
        ];
        let result = format_summary_with_width(&entries, false, None);
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines[0], "Class 4   #1    9.00  P1   Solar Oven  Asha, Ravi");
        assert_eq!(lines[1], "Class 10  #2    8.50  P12  Water Filter  Asha, Ravi");
    }

    #[test]
    fn test_summary_table_truncates_to_terminal() {
        let entries = vec![entry("Class 4", 1, "P1", "A very long project title about volcanoes", 9.0)];
        let result = format_summary_with_width(&entries, false, Some(60));
        assert!(result.contains("..."));
        assert!(result.chars().count() <= 60);
    }

    #[test]
    fn test_run_report_lists_every_class() {
        let classes = vec![
            ClassOutcome {
                class_name: "Class 4".to_string(),
                result: ClassResult::Succeeded { judges: 2, projects: 6, ranked: 5 },
            },
            ClassOutcome {
                class_name: "Class 5".to_string(),
                result: ClassResult::Failed { error: "failed to read roster".to_string() },
            },
            ClassOutcome {
                class_name: "Class 9".to_string(),
                result: ClassResult::Unconfigured,
            },
        ];
        let result = format_run_report(&report(classes, RunStatus::Partial), false);

        assert!(result.contains("Class 4  ok       2 judges, 6 projects, 5 ranked"));
        assert!(result.contains("Class 5  failed   failed to read roster"));
        assert!(result.contains("Class 9  skipped  no spreadsheet configured"));
        assert!(result.contains("Solar Oven"));
        assert!(result.ends_with("2 of 3 classes failed; summary covers the rest (1.5s)"));
    }

    #[test]
    fn test_run_report_complete_status() {
        let classes = vec![ClassOutcome {
            class_name: "Class 4".to_string(),
            result: ClassResult::Succeeded { judges: 1, projects: 1, ranked: 1 },
        }];
        let result = format_run_report(&report(classes, RunStatus::Complete), false);
        assert!(result.ends_with("All 1 classes aggregated in 1.5s"));
    }

    #[test]
    fn test_run_report_shows_summary_write_failure() {
        let classes = vec![ClassOutcome {
            class_name: "Class 4".to_string(),
            result: ClassResult::Succeeded { judges: 1, projects: 1, ranked: 1 },
        }];
        let mut report = report(classes, RunStatus::Complete);
        report.summary_written = false;
        report.summary_error = Some("store rejected the request: HTTP 403".to_string());

        let result = format_run_report(&report, false);

        assert!(result.contains("Class 4  ok"));
        assert!(result.ends_with("Summary table not written: store rejected the request: HTTP 403"));
    }

    #[test]
    fn test_format_tsv() {
        let rows = vec![
            vec!["Project ID".to_string(), "Average".to_string()],
            vec!["P1".to_string(), "9.00".to_string()],
        ];
        assert_eq!(format_tsv(&rows), "Project ID\tAverage\nP1\t9.00");
    }

    #[test]
    fn test_format_roster() {
        let projects = vec![
            RosterProject {
                project_id: "P1".to_string(),
                title: "Volcano".to_string(),
                theme: "Earth".to_string(),
                student_names: vec!["Ravi".to_string()],
            },
            RosterProject {
                project_id: "P12".to_string(),
                title: "Solar Oven".to_string(),
                theme: "Energy".to_string(),
                student_names: vec!["Asha".to_string(), "Zoya".to_string()],
            },
        ];
        assert_eq!(
            format_roster(&projects, false),
            "P1   Volcano     Earth  Ravi\nP12  Solar Oven  Energy  Asha, Zoya"
        );
        assert_eq!(format_roster(&[], false), "No projects found.");
    }

    #[test]
    fn test_format_judge_rows_starts_with_header() {
        let result = format_judge_rows(&[]);
        assert!(result.starts_with("S.No.\tName of the Student"));
        assert_eq!(result.lines().count(), 1);
    }

    #[test]
    fn test_class_list_marks_unconfigured() {
        let mut classes = BTreeMap::new();
        classes.insert("Class 4".to_string(), "abc".to_string());
        classes.insert("Class 10".to_string(), " ".to_string());
        let result = format_class_list(&classes, false);
        assert_eq!(result, "Class 10  (not configured)\nClass 4   abc");
    }

    // truncate_title tests
    #[test]
    fn test_truncate_title_short() {
        assert_eq!(truncate_title("Short title", 20), "Short title");
    }

    #[test]
    fn test_truncate_title_long() {
        assert_eq!(truncate_title("This is a very long title", 15), "This is a ve...");
    }

    #[test]
    fn test_truncate_title_very_narrow() {
        assert_eq!(truncate_title("Hello world", 3), "Hel");
    }
}
