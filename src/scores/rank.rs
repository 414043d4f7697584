use std::cmp::Ordering;

use super::aggregate::{published_average, ProjectRecord};

/// Number of distinct score tiers kept per class
pub const DEFAULT_TIERS: usize = 3;

/// A project placed in its class's top list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedProject {
    /// Class label, e.g. "Class 7"
    pub standard: String,
    /// 1-based dense rank; tied scores share a rank
    pub rank: u32,
    /// Overall average at two decimals, as written to the tables
    pub average: f64,
    pub record: ProjectRecord,
}

/// Rank a class's projects and keep the top `tiers` distinct scores.
///
/// Projects are ordered by their published two-decimal average descending;
/// equal averages keep the input order (project-id order from the aggregator).
/// Ranks are dense, so every project tied at the cutoff score is included.
///
/// `[9.0, 9.0, 8.5, 8.0, 8.0, 7.0]` yields five entries ranked `1, 1, 2, 3, 3`.
pub fn rank_projects(class_name: &str, records: &[ProjectRecord], tiers: usize) -> Vec<RankedProject> {
    let mut scored: Vec<(f64, &ProjectRecord)> =
        records.iter().map(|r| (published_average(r.average()), r)).collect();

    // Stable sort keeps project-id order among equal scores
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut ranked = Vec::new();
    let mut rank: u32 = 0;
    let mut previous: Option<f64> = None;

    for (average, record) in scored {
        if previous != Some(average) {
            rank += 1;
            if rank as usize > tiers {
                break;
            }
            previous = Some(average);
        }
        ranked.push(RankedProject {
            standard: class_name.to_string(),
            rank,
            average,
            record: record.clone(),
        });
    }

    ranked
}
