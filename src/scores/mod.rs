pub mod aggregate;
pub mod parse;
pub mod rank;
pub mod reduce;
pub mod roster;
pub mod summary;
pub mod types;

pub use aggregate::{aggregate_class, format_average, published_average, ProjectRecord};
pub use parse::{parse_judge_table, parse_score_row, records_from_grid, score_row_cells, RawRecord};
pub use rank::{rank_projects, RankedProject, DEFAULT_TIERS};
pub use reduce::{latest_by_project, merge_judges, JudgedScores};
pub use roster::{reduce_roster, RosterProject};
pub use summary::{merge_rankings, AdminSummaryEntry};
pub use types::{Attendance, CriterionScores, ScoreRow, ThemeFit};
