use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::config::Config;
use crate::error::{ClassError, RunError, StoreError};
use crate::scores::{
    aggregate_class, latest_by_project, merge_judges, merge_rankings, parse_judge_table,
    rank_projects, reduce_roster, score_row_cells, AdminSummaryEntry, RankedProject, RosterProject,
    ScoreRow,
};
use crate::store::layout::{self, JUDGE_HEADER, SCORE_HEADER, SUMMARY_HEADER};
use crate::store::{with_retry, Grid, RetryPolicy, SheetRange, TabularStore};

/// Settings a run needs, resolved once from the configuration
#[derive(Debug, Clone)]
struct RunSettings {
    roster: SheetRange,
    score_sheet: String,
    tiers: usize,
    retry: RetryPolicy,
}

impl RunSettings {
    fn from_config(config: &Config) -> Result<Self, RunError> {
        Ok(Self {
            roster: config.roster().map_err(|e| RunError::Config(e.to_string()))?,
            score_sheet: config.score_sheet.clone(),
            tiers: config.ranking.tiers,
            retry: config.retry.policy().map_err(|e| RunError::Config(e.to_string()))?,
        })
    }
}

/// Result of aggregating one class
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassResult {
    Succeeded {
        judges: usize,
        projects: usize,
        ranked: usize,
    },
    /// No spreadsheet configured; nothing was read or written
    Unconfigured,
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassOutcome {
    pub class_name: String,
    #[serde(flatten)]
    pub result: ClassResult,
}

impl ClassOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, ClassResult::Succeeded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every class aggregated
    Complete,
    /// Some classes failed; the summary covers the rest
    Partial,
    /// No class aggregated; the summary table was left untouched
    Failed,
}

/// Everything an aggregation run did, in class order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub classes: Vec<ClassOutcome>,
    pub summary: Vec<AdminSummaryEntry>,
    pub summary_written: bool,
    /// Why the summary table could not be written; class score tables are already updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<String>,
}

impl RunReport {
    pub fn failed_classes(&self) -> impl Iterator<Item = &ClassOutcome> {
        self.classes.iter().filter(|c| !c.succeeded())
    }
}

struct ClassSuccess {
    judges: usize,
    projects: usize,
    ranking: Vec<RankedProject>,
}

/// Aggregate one class: read roster and judge tables, rewrite its score table, rank it.
async fn process_class(
    store: &dyn TabularStore,
    settings: &RunSettings,
    class_name: &str,
    spreadsheet_id: Option<&str>,
) -> Result<ClassSuccess, ClassError> {
    let Some(spreadsheet_id) = spreadsheet_id else {
        return Err(ClassError::Unconfigured {
            class: class_name.to_string(),
        });
    };
    let fetch_err = |what: &'static str| {
        move |source: StoreError| ClassError::Fetch {
            class: class_name.to_string(),
            what,
            source,
        }
    };
    let policy = &settings.retry;

    let roster_grid = with_retry(policy, "read roster", || {
        store.read_range(spreadsheet_id, &settings.roster)
    })
    .await
    .map_err(fetch_err("roster"))?;
    let roster = reduce_roster(&roster_grid);

    let titles = with_retry(policy, "list sheets", || store.sheet_titles(spreadsheet_id))
        .await
        .map_err(fetch_err("sheet list"))?;

    let judges: Vec<(String, SheetRange)> = titles
        .iter()
        .filter_map(|title| {
            let judge = layout::judge_name(title)?;
            Some((judge.to_string(), layout::judge_range(title)))
        })
        .collect();
    let ranges: Vec<SheetRange> = judges.iter().map(|(_, range)| range.clone()).collect();

    let grids = with_retry(policy, "read judge tables", || {
        store.batch_read(spreadsheet_id, &ranges)
    })
    .await
    .map_err(fetch_err("judge tables"))?;

    let judged = merge_judges(judges.iter().zip(grids.iter()).map(|((judge, _), grid)| {
        let rows = parse_judge_table(grid);
        tracing::debug!(class = class_name, judge = judge.as_str(), rows = rows.len(), "parsed judge table");
        (judge.clone(), latest_by_project(rows))
    }));

    let records = aggregate_class(class_name, &roster, &judged);
    let header = layout::header_row(&SCORE_HEADER);
    let rows: Grid = records.iter().map(|r| r.score_table_row()).collect();

    with_retry(policy, "write score table", || {
        store.replace_table(spreadsheet_id, &settings.score_sheet, &header, &rows)
    })
    .await
    .map_err(|source| ClassError::Write {
        class: class_name.to_string(),
        source,
    })?;

    let ranking = rank_projects(class_name, &records, settings.tiers);
    tracing::info!(
        class = class_name,
        judges = judges.len(),
        projects = records.len(),
        ranked = ranking.len(),
        "class aggregated"
    );

    Ok(ClassSuccess {
        judges: judges.len(),
        projects: records.len(),
        ranking,
    })
}

/// Aggregate every configured class concurrently, then write the cross-class summary.
///
/// Fails before touching the store when the summary spreadsheet or the class list is
/// missing. A failing class is reported in its outcome and left out of the summary;
/// the summary table is rewritten only when at least one class succeeded. A failed
/// summary write is recorded in the report next to the class outcomes.
pub async fn run_aggregation(store: &dyn TabularStore, config: &Config) -> Result<RunReport, RunError> {
    let summary_id = config.summary_spreadsheet().ok_or(RunError::SummaryUnconfigured)?;
    if config.classes.is_empty() {
        return Err(RunError::NoClasses);
    }
    let settings = RunSettings::from_config(config)?;
    let started_at = Utc::now();

    let mut futures = FuturesUnordered::new();
    for class_name in config.classes.keys() {
        let settings = &settings;
        let spreadsheet_id = config.class_spreadsheet(class_name);
        futures.push(async move {
            let result = process_class(store, settings, class_name, spreadsheet_id).await;
            (class_name.clone(), result)
        });
    }

    let mut finished = Vec::new();
    while let Some((class_name, result)) = futures.next().await {
        if let Err(ref e) = result {
            tracing::warn!(class = class_name.as_str(), error = %e, "class failed");
        }
        finished.push((class_name, result));
    }
    // Completion order varies; report in class order
    finished.sort_by(|a, b| a.0.cmp(&b.0));

    let mut outcomes = Vec::with_capacity(finished.len());
    let mut rankings = Vec::new();
    for (class_name, result) in finished {
        let result = match result {
            Ok(success) => {
                let outcome = ClassResult::Succeeded {
                    judges: success.judges,
                    projects: success.projects,
                    ranked: success.ranking.len(),
                };
                rankings.push(success.ranking);
                outcome
            }
            Err(ClassError::Unconfigured { .. }) => ClassResult::Unconfigured,
            Err(e) => ClassResult::Failed { error: e.to_string() },
        };
        outcomes.push(ClassOutcome { class_name, result });
    }

    let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
    let status = if succeeded == outcomes.len() {
        RunStatus::Complete
    } else if succeeded > 0 {
        RunStatus::Partial
    } else {
        RunStatus::Failed
    };

    let summary = merge_rankings(rankings);
    let mut summary_error = None;
    let summary_written = if succeeded > 0 {
        let header = layout::header_row(&SUMMARY_HEADER);
        let rows: Grid = summary.iter().map(|e| e.to_row()).collect();
        match with_retry(&settings.retry, "write summary table", || {
            store.replace_table(summary_id, &config.summary_sheet, &header, &rows)
        })
        .await
        {
            Ok(()) => {
                tracing::info!(entries = summary.len(), "summary table written");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to write summary table");
                summary_error = Some(e.to_string());
                false
            }
        }
    } else {
        tracing::warn!("no class succeeded; summary table left unchanged");
        false
    };

    Ok(RunReport {
        started_at,
        finished_at: Utc::now(),
        status,
        classes: outcomes,
        summary,
        summary_written,
        summary_error,
    })
}

/// Read the current summary table back
pub async fn read_summary(store: &dyn TabularStore, config: &Config) -> anyhow::Result<Vec<AdminSummaryEntry>> {
    let summary_id = config.summary_spreadsheet().ok_or(RunError::SummaryUnconfigured)?;
    let policy = config.retry.policy()?;
    let range = SheetRange::columns(&config.summary_sheet, 0, SUMMARY_HEADER.len() - 1);

    let grid = with_retry(&policy, "read summary table", || store.read_range(summary_id, &range))
        .await
        .context("Failed to read summary table")?;
    Ok(grid.iter().filter_map(|row| AdminSummaryEntry::from_row(row)).collect())
}

/// Read a class's score table back, header included
pub async fn read_score_table(
    store: &dyn TabularStore,
    config: &Config,
    class_name: &str,
) -> anyhow::Result<Grid> {
    let spreadsheet_id = class_spreadsheet(config, class_name)?;
    let policy = config.retry.policy()?;
    let range = SheetRange::columns(&config.score_sheet, 0, SCORE_HEADER.len() - 1);

    with_retry(&policy, "read score table", || store.read_range(spreadsheet_id, &range))
        .await
        .with_context(|| format!("Failed to read score table for {}", class_name))
}

/// Read a class roster, one entry per project in project-id order.
///
/// With `project_id`, only that project is returned (none if it is not listed).
pub async fn read_roster(
    store: &dyn TabularStore,
    config: &Config,
    class_name: &str,
    project_id: Option<&str>,
) -> anyhow::Result<Vec<RosterProject>> {
    let spreadsheet_id = class_spreadsheet(config, class_name)?;
    let policy = config.retry.policy()?;
    let range = config.roster()?;

    let grid = with_retry(&policy, "read roster", || store.read_range(spreadsheet_id, &range))
        .await
        .with_context(|| format!("Failed to read roster for {}", class_name))?;

    let roster = reduce_roster(&grid);
    Ok(match project_id.map(str::trim) {
        Some(id) => roster.get(id).cloned().into_iter().collect(),
        None => roster.into_values().collect(),
    })
}

/// Read a judge's saved rows for a class in append order, superseded rows included.
///
/// A judge who has not submitted yet has no table and no rows. With `project_id`,
/// only rows for that project are returned.
pub async fn read_judge_scores(
    store: &dyn TabularStore,
    config: &Config,
    class_name: &str,
    judge: &str,
    project_id: Option<&str>,
) -> anyhow::Result<Vec<ScoreRow>> {
    let judge = judge.trim();
    if judge.is_empty() {
        anyhow::bail!("Judge name must not be empty");
    }
    let spreadsheet_id = class_spreadsheet(config, class_name)?;
    let policy = config.retry.policy()?;

    let sheet = layout::judge_sheet_name(judge);
    let range = layout::judge_range(&sheet);
    let grid = match with_retry(&policy, "read judge table", || store.read_range(spreadsheet_id, &range)).await {
        Ok(grid) => grid,
        Err(StoreError::NotFound(_)) => {
            tracing::debug!(class = class_name, sheet = sheet.as_str(), "no judge table yet");
            Grid::new()
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("Failed to read {} for {}", sheet, class_name)));
        }
    };

    let rows = parse_judge_table(&grid);
    Ok(match project_id.map(str::trim) {
        Some(id) => rows.into_iter().filter(|row| row.project_id == id).collect(),
        None => rows,
    })
}

/// Append a judge's submission to their judge table, creating it if needed.
///
/// Judge tables are append-only; a later row for the same project supersedes
/// earlier ones when the class is next aggregated.
pub async fn submit_scores(
    store: &dyn TabularStore,
    config: &Config,
    class_name: &str,
    judge: &str,
    rows: &[ScoreRow],
) -> anyhow::Result<usize> {
    let judge = judge.trim();
    if judge.is_empty() {
        anyhow::bail!("Judge name must not be empty");
    }
    if let Some(row) = rows.iter().find(|r| r.project_id.trim().is_empty()) {
        anyhow::bail!("Score row for '{}' has no project id", row.student_name);
    }
    let spreadsheet_id = class_spreadsheet(config, class_name)?;
    let policy = config.retry.policy()?;

    let sheet = layout::judge_sheet_name(judge);
    let header = layout::header_row(&JUDGE_HEADER);
    let cells: Grid = rows.iter().map(score_row_cells).collect();

    with_retry(&policy, "append judge scores", || {
        store.append_rows(spreadsheet_id, &sheet, &header, &cells)
    })
    .await
    .with_context(|| format!("Failed to append scores to {} for {}", sheet, class_name))?;

    tracing::info!(class = class_name, judge, rows = rows.len(), "appended judge scores");
    Ok(rows.len())
}

fn class_spreadsheet<'a>(config: &'a Config, class_name: &str) -> anyhow::Result<&'a str> {
    if !config.classes.contains_key(class_name) {
        anyhow::bail!("Unknown class '{}'", class_name);
    }
    config
        .class_spreadsheet(class_name)
        .ok_or_else(|| ClassError::Unconfigured { class: class_name.to_string() }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::{Attendance, CriterionScores};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    /// Spreadsheets held in memory; ids in `broken` fail every call as transient
    #[derive(Default)]
    struct MemoryStore {
        books: Mutex<BTreeMap<String, Vec<(String, Grid)>>>,
        broken: BTreeSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn put(&self, id: &str, sheet: &str, rows: &[&[&str]]) {
            let grid: Grid = rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect();
            let mut books = self.books.lock().unwrap();
            let book = books.entry(id.to_string()).or_default();
            book.retain(|(title, _)| title != sheet);
            book.push((sheet.to_string(), grid));
        }

        fn sheet(&self, id: &str, sheet: &str) -> Option<Grid> {
            let books = self.books.lock().unwrap();
            books
                .get(id)?
                .iter()
                .find(|(title, _)| title == sheet)
                .map(|(_, grid)| grid.clone())
        }

        fn touched(&self, id: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| c == id)
        }

        fn enter(&self, id: &str) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(id.to_string());
            if self.broken.contains(id) {
                return Err(StoreError::Transient(format!("{} unavailable", id)));
            }
            Ok(())
        }

        fn read(&self, id: &str, range: &SheetRange) -> Result<Grid, StoreError> {
            self.enter(id)?;
            let books = self.books.lock().unwrap();
            let book = books
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            book.iter()
                .find(|(title, _)| *title == range.sheet)
                .map(|(_, grid)| range.select(grid))
                .ok_or_else(|| StoreError::NotFound(range.sheet.clone()))
        }

        fn write(&self, id: &str, sheet: &str, header: &[String], rows: &[Vec<String>], append: bool) -> Result<(), StoreError> {
            self.enter(id)?;
            let mut books = self.books.lock().unwrap();
            let book = books.entry(id.to_string()).or_default();
            let index = match book.iter().position(|(title, _)| title == sheet) {
                Some(i) => i,
                None => {
                    book.push((sheet.to_string(), vec![header.to_vec()]));
                    book.len() - 1
                }
            };
            let grid = &mut book[index].1;
            if !append {
                grid.truncate(1);
            }
            grid.extend(rows.iter().cloned());
            Ok(())
        }
    }

    #[async_trait]
    impl TabularStore for MemoryStore {
        async fn sheet_titles(&self, id: &str) -> Result<Vec<String>, StoreError> {
            self.enter(id)?;
            let books = self.books.lock().unwrap();
            let book = books
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            Ok(book.iter().map(|(title, _)| title.clone()).collect())
        }

        async fn read_range(&self, id: &str, range: &SheetRange) -> Result<Grid, StoreError> {
            self.read(id, range)
        }

        async fn batch_read(&self, id: &str, ranges: &[SheetRange]) -> Result<Vec<Grid>, StoreError> {
            ranges.iter().map(|range| self.read(id, range)).collect()
        }

        async fn replace_table(
            &self,
            id: &str,
            sheet: &str,
            header: &[String],
            rows: &[Vec<String>],
        ) -> Result<(), StoreError> {
            self.write(id, sheet, header, rows, false)
        }

        async fn append_rows(
            &self,
            id: &str,
            sheet: &str,
            header: &[String],
            rows: &[Vec<String>],
        ) -> Result<(), StoreError> {
            self.write(id, sheet, header, rows, true)
        }
    }

    const ROSTER_HEADER: &[&str] = &["S.No.", "Name", "Grade", "Project Title", "Project ID", "Theme"];
    const JUDGE_HDR: &[&str] = &[
        "S.No.", "Name", "Grade", "Project Title", "Project ID", "C", "S", "T", "P", "Status", "Theme Fit",
    ];

    fn config(classes: &[(&str, &str)]) -> Config {
        let mut config = Config {
            summary_spreadsheet_id: Some("admin".to_string()),
            ..Config::default()
        };
        config.retry.attempts = 0;
        for (name, id) in classes {
            config.classes.insert(name.to_string(), id.to_string());
        }
        config
    }

    /// Class with six projects whose single judge gives uniform scores
    fn seed_ranking_class(store: &MemoryStore, id: &str) {
        let scores = [("P1", "9"), ("P2", "9"), ("P3", "8.5"), ("P4", "8"), ("P5", "8"), ("P6", "7")];
        let mut roster: Vec<Vec<String>> = vec![ROSTER_HEADER.iter().map(|s| s.to_string()).collect()];
        let mut judge: Vec<Vec<String>> = vec![JUDGE_HDR.iter().map(|s| s.to_string()).collect()];
        for (i, (project, score)) in scores.iter().enumerate() {
            let student = format!("Student {}", i + 1);
            let title = format!("Project {}", project);
            roster.push(vec![
                (i + 1).to_string(),
                student.clone(),
                "4".to_string(),
                title.clone(),
                project.to_string(),
                "Energy".to_string(),
            ]);
            judge.push(vec![
                (i + 1).to_string(),
                student,
                "4".to_string(),
                title,
                project.to_string(),
                score.to_string(),
                score.to_string(),
                score.to_string(),
                score.to_string(),
                "Present".to_string(),
                "Strongly Fits".to_string(),
            ]);
        }
        let mut books = store.books.lock().unwrap();
        let book = books.entry(id.to_string()).or_default();
        book.push(("Sheet1".to_string(), roster));
        book.push(("Judge_Ann".to_string(), judge));
    }

    #[tokio::test]
    async fn test_run_ranks_dense_tiers() {
        let store = MemoryStore::default();
        seed_ranking_class(&store, "c4");

        let report = run_aggregation(&store, &config(&[("Class 4", "c4")])).await.unwrap();

        assert_eq!(report.status, RunStatus::Complete);
        assert!(report.summary_written);
        let ranks: Vec<(u32, &str)> = report
            .summary
            .iter()
            .map(|e| (e.rank, e.project_id.as_str()))
            .collect();
        assert_eq!(ranks, vec![(1, "P1"), (1, "P2"), (2, "P3"), (3, "P4"), (3, "P5")]);

        let score = store.sheet("c4", "Score").unwrap();
        assert_eq!(score.len(), 7);
        assert_eq!(score[0][0], "Project ID");
        assert_eq!(
            score[1],
            vec!["P1", "Project P1", "Energy", "9.00", "9.00", "9.00", "9.00", "9.00", "Student 1"]
        );

        let summary = store.sheet("admin", "Summary").unwrap();
        assert_eq!(summary.len(), 6);
        assert_eq!(summary[3], vec!["Class 4", "2", "P3", "Project P3", "Energy", "8.50", "Student 3"]);
    }

    #[tokio::test]
    async fn test_rerun_writes_identical_tables() {
        let store = MemoryStore::default();
        seed_ranking_class(&store, "c4");
        let config = config(&[("Class 4", "c4")]);

        let first = run_aggregation(&store, &config).await.unwrap();
        let score_before = store.sheet("c4", "Score");
        let summary_before = store.sheet("admin", "Summary");

        let second = run_aggregation(&store, &config).await.unwrap();
        assert_eq!(first.summary, second.summary);
        assert_eq!(store.sheet("c4", "Score"), score_before);
        assert_eq!(store.sheet("admin", "Summary"), summary_before);
    }

    #[tokio::test]
    async fn test_latest_row_wins_and_absent_judge_not_counted() {
        let store = MemoryStore::default();
        store.put("c4", "Sheet1", &[ROSTER_HEADER, &["1", "Ravi", "4", "Volcano", "P1", "Earth"]]);
        store.put(
            "c4",
            "Judge_A",
            &[
                JUDGE_HDR,
                &["1", "Ravi", "4", "Volcano", "P1", "5", "5", "5", "5", "Present", ""],
                &["1", "Ravi", "4", "Volcano", "P1", "8", "7", "7", "7", "Present", ""],
            ],
        );
        store.put(
            "c4",
            "Judge_B",
            &[JUDGE_HDR, &["1", "Ravi", "4", "Volcano", "P1", "", "", "", "", "Absent", ""]],
        );

        let report = run_aggregation(&store, &config(&[("Class 4", "c4")])).await.unwrap();

        let score = store.sheet("c4", "Score").unwrap();
        assert_eq!(
            score[1],
            vec!["P1", "Volcano", "Earth", "8.00", "7.00", "7.00", "7.00", "7.25", "Ravi"]
        );
        assert!(matches!(
            report.classes[0].result,
            ClassResult::Succeeded { judges: 2, projects: 1, ranked: 1 }
        ));
    }

    #[tokio::test]
    async fn test_unjudged_project_scores_zero() {
        let store = MemoryStore::default();
        store.put("c4", "Sheet1", &[ROSTER_HEADER, &["1", "Ravi", "4", "Volcano", "P1", "Earth"]]);

        let report = run_aggregation(&store, &config(&[("Class 4", "c4")])).await.unwrap();

        let score = store.sheet("c4", "Score").unwrap();
        assert_eq!(&score[1][3..8], &["0.00", "0.00", "0.00", "0.00", "0.00"]);
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].average, 0.0);
    }

    #[tokio::test]
    async fn test_orphan_project_is_included() {
        let store = MemoryStore::default();
        store.put("c4", "Sheet1", &[ROSTER_HEADER]);
        store.put(
            "c4",
            "Judge_A",
            &[JUDGE_HDR, &["1", "Mei", "4", "Robot Arm", "P9", "6", "6", "6", "6", "Present", ""]],
        );

        run_aggregation(&store, &config(&[("Class 4", "c4")])).await.unwrap();

        let score = store.sheet("c4", "Score").unwrap();
        assert_eq!(
            score[1],
            vec!["P9", "Robot Arm", "", "6.00", "6.00", "6.00", "6.00", "6.00", "Mei"]
        );
    }

    #[tokio::test]
    async fn test_failed_class_leaves_others_intact() {
        let mut store = MemoryStore::default();
        seed_ranking_class(&store, "c4");
        store.broken.insert("c5".to_string());

        let report = run_aggregation(&store, &config(&[("Class 4", "c4"), ("Class 5", "c5")]))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Partial);
        assert!(report.summary_written);
        assert!(report.summary.iter().all(|e| e.standard == "Class 4"));
        let failed: Vec<&str> = report.failed_classes().map(|c| c.class_name.as_str()).collect();
        assert_eq!(failed, vec!["Class 5"]);
        match &report.classes[1].result {
            ClassResult::Failed { error } => assert!(error.contains("roster")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_class_is_not_fetched() {
        let store = MemoryStore::default();
        seed_ranking_class(&store, "c4");

        let report = run_aggregation(&store, &config(&[("Class 4", "c4"), ("Class 9", "")]))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Partial);
        assert!(matches!(report.classes[1].result, ClassResult::Unconfigured));
        assert!(!store.touched(""));
    }

    #[tokio::test]
    async fn test_summary_untouched_when_every_class_fails() {
        let mut store = MemoryStore::default();
        store.broken.insert("c4".to_string());
        store.put("admin", "Summary", &[&["Standard"], &["Class 4", "1", "OLD"]]);

        let report = run_aggregation(&store, &config(&[("Class 4", "c4")])).await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert!(!report.summary_written);
        assert_eq!(store.sheet("admin", "Summary").unwrap()[1][2], "OLD");
    }

    #[tokio::test]
    async fn test_summary_write_failure_keeps_class_outcomes() {
        let mut store = MemoryStore::default();
        seed_ranking_class(&store, "c4");
        seed_ranking_class(&store, "c5");
        store.broken.insert("admin".to_string());

        let report = run_aggregation(&store, &config(&[("Class 4", "c4"), ("Class 5", "c5")]))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Complete);
        assert!(report.classes.iter().all(|c| c.succeeded()));
        assert!(!report.summary_written);
        assert!(report.summary_error.as_deref().unwrap().contains("admin unavailable"));
        assert_eq!(report.summary.len(), 10);
        assert_eq!(store.sheet("c4", "Score").unwrap().len(), 7);
        assert_eq!(store.sheet("c5", "Score").unwrap().len(), 7);
        assert!(store.sheet("admin", "Summary").is_none());
    }

    #[tokio::test]
    async fn test_missing_summary_id_fails_before_reading() {
        let store = MemoryStore::default();
        seed_ranking_class(&store, "c4");
        let mut config = config(&[("Class 4", "c4")]);
        config.summary_spreadsheet_id = None;

        let err = run_aggregation(&store, &config).await.unwrap_err();

        assert!(matches!(err, RunError::SummaryUnconfigured));
        assert!(!store.touched("c4"));
    }

    #[tokio::test]
    async fn test_no_classes_is_an_error() {
        let store = MemoryStore::default();
        let err = run_aggregation(&store, &config(&[])).await.unwrap_err();
        assert!(matches!(err, RunError::NoClasses));
    }

    #[tokio::test]
    async fn test_summary_ordered_by_class_regardless_of_config_order() {
        let store = MemoryStore::default();
        seed_ranking_class(&store, "c4");
        seed_ranking_class(&store, "c5");

        let report = run_aggregation(&store, &config(&[("Class 5", "c5"), ("Class 4", "c4")]))
            .await
            .unwrap();

        let classes: Vec<&str> = report.summary.iter().map(|e| e.standard.as_str()).collect();
        assert_eq!(classes[..5], ["Class 4"; 5]);
        assert_eq!(classes[5..], ["Class 5"; 5]);
    }

    #[tokio::test]
    async fn test_read_summary_round_trips_written_table() {
        let store = MemoryStore::default();
        seed_ranking_class(&store, "c4");
        let config = config(&[("Class 4", "c4")]);

        let report = run_aggregation(&store, &config).await.unwrap();
        let read_back = read_summary(&store, &config).await.unwrap();

        assert_eq!(read_back.len(), report.summary.len());
        assert_eq!(read_back[2].project_id, "P3");
        assert_eq!(read_back[2].average, 8.5);
    }

    #[tokio::test]
    async fn test_submit_appends_and_supersedes() {
        let store = MemoryStore::default();
        store.put("c4", "Sheet1", &[ROSTER_HEADER, &["1", "Ravi", "4", "Volcano", "P1", "Earth"]]);
        let config = config(&[("Class 4", "c4")]);
        let row = |c: f64| ScoreRow {
            serial: "1".to_string(),
            student_name: "Ravi".to_string(),
            grade: "4".to_string(),
            project_title: "Volcano".to_string(),
            project_id: "P1".to_string(),
            scores: CriterionScores {
                creativity: Some(c),
                scientific_thought: Some(6.0),
                technical_skills: Some(6.0),
                presentation: Some(6.0),
            },
            status: Attendance::Present,
            theme_fit: None,
        };

        submit_scores(&store, &config, "Class 4", "Ann", &[row(2.0)]).await.unwrap();
        submit_scores(&store, &config, "Class 4", "Ann", &[row(10.0)]).await.unwrap();

        let judge = store.sheet("c4", "Judge_Ann").unwrap();
        assert_eq!(judge.len(), 3);
        assert_eq!(judge[0][0], "S.No.");

        run_aggregation(&store, &config).await.unwrap();
        let score = store.sheet("c4", "Score").unwrap();
        assert_eq!(score[1][3], "10.00");
        assert_eq!(score[1][7], "7.00");
    }

    #[tokio::test]
    async fn test_read_roster_lists_projects_and_students() {
        let store = MemoryStore::default();
        store.put(
            "c4",
            "Sheet1",
            &[
                ROSTER_HEADER,
                &["1", "Zoya", "4", "Solar Oven", "P2", "Energy"],
                &["2", "Asha", "4", "Solar Oven", "P2", "Energy"],
                &["3", "Ravi", "4", "Volcano", "P1", "Earth"],
            ],
        );
        let config = config(&[("Class 4", "c4")]);

        let all = read_roster(&store, &config, "Class 4", None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P2"]);

        let one = read_roster(&store, &config, "Class 4", Some(" P2 ")).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].student_names, vec!["Asha", "Zoya"]);

        assert!(read_roster(&store, &config, "Class 4", Some("P9")).await.unwrap().is_empty());
        assert!(read_roster(&store, &config, "Class 7", None).await.is_err());
    }

    #[tokio::test]
    async fn test_read_judge_scores_filters_by_project() {
        let store = MemoryStore::default();
        store.put(
            "c4",
            "Judge_Ann",
            &[
                JUDGE_HDR,
                &["1", "Ravi", "4", "Volcano", "P1", "5", "5", "5", "5", "Present", ""],
                &["2", "Mei", "4", "Robot Arm", "P2", "6", "6", "6", "6", "Present", ""],
                &["1", "Ravi", "4", "Volcano", "P1", "8", "7", "7", "7", "Present", ""],
            ],
        );
        let config = config(&[("Class 4", "c4")]);

        let all = read_judge_scores(&store, &config, "Class 4", "Ann", None).await.unwrap();
        assert_eq!(all.len(), 3);

        let p1 = read_judge_scores(&store, &config, "Class 4", "Ann", Some("P1")).await.unwrap();
        let creativity: Vec<Option<f64>> = p1.iter().map(|r| r.scores.creativity).collect();
        assert_eq!(creativity, vec![Some(5.0), Some(8.0)]);
    }

    #[tokio::test]
    async fn test_read_judge_scores_without_table_is_empty() {
        let store = MemoryStore::default();
        store.put("c4", "Sheet1", &[ROSTER_HEADER]);
        let config = config(&[("Class 4", "c4")]);

        let rows = read_judge_scores(&store, &config, "Class 4", "Bo", None).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_read_judge_scores_reports_store_failures() {
        let mut store = MemoryStore::default();
        store.broken.insert("c4".to_string());
        let config = config(&[("Class 4", "c4")]);

        let err = read_judge_scores(&store, &config, "Class 4", "Ann", None).await.unwrap_err();
        assert!(err.to_string().contains("Judge_Ann"));
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_class_and_blank_judge() {
        let store = MemoryStore::default();
        let config = config(&[("Class 4", "c4"), ("Class 9", "")]);

        assert!(submit_scores(&store, &config, "Class 7", "Ann", &[]).await.is_err());
        assert!(submit_scores(&store, &config, "Class 4", "  ", &[]).await.is_err());
        let err = submit_scores(&store, &config, "Class 9", "Ann", &[]).await.unwrap_err();
        assert!(err.to_string().contains("no spreadsheet is configured"));
    }
}
