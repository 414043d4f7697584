use serde::{Deserialize, Serialize};
use std::fmt;

/// The four rubric criteria, carried as one value per criterion.
///
/// The same shape holds a judge's raw scores (`Option<f64>`), running sums
/// and averages (`f64`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriterionScores<T> {
    pub creativity: T,
    pub scientific_thought: T,
    pub technical_skills: T,
    pub presentation: T,
}

impl<T: Copy> CriterionScores<T> {
    /// Values in column order: creativity, scientific thought, technical skills, presentation
    pub fn values(&self) -> [T; 4] {
        [
            self.creativity,
            self.scientific_thought,
            self.technical_skills,
            self.presentation,
        ]
    }

    pub fn map<U>(self, f: impl Fn(T) -> U) -> CriterionScores<U> {
        CriterionScores {
            creativity: f(self.creativity),
            scientific_thought: f(self.scientific_thought),
            technical_skills: f(self.technical_skills),
            presentation: f(self.presentation),
        }
    }
}

impl CriterionScores<f64> {
    /// Unweighted mean of the four criteria
    pub fn mean(&self) -> f64 {
        self.values().iter().sum::<f64>() / 4.0
    }

    /// Add a judge's scores, counting a missing criterion as zero
    pub fn add_scores(&mut self, scores: &CriterionScores<Option<f64>>) {
        self.creativity += scores.creativity.unwrap_or(0.0);
        self.scientific_thought += scores.scientific_thought.unwrap_or(0.0);
        self.technical_skills += scores.technical_skills.unwrap_or(0.0);
        self.presentation += scores.presentation.unwrap_or(0.0);
    }
}

/// Attendance recorded by a judge when scoring a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Attendance {
    #[default]
    Present,
    Absent,
}

impl Attendance {
    /// Blank and unrecognised values are treated as present
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("absent") {
            Attendance::Absent
        } else {
            Attendance::Present
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Present => "Present",
            Attendance::Absent => "Absent",
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How well a project matches the fair's theme, in the judge's opinion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemeFit {
    #[serde(rename = "Strongly Fits")]
    Strongly,
    #[serde(rename = "Moderately Fits")]
    Moderately,
    #[serde(rename = "Slightly Fits")]
    Slightly,
}

impl ThemeFit {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("strongly fits") {
            Some(ThemeFit::Strongly)
        } else if s.eq_ignore_ascii_case("moderately fits") {
            Some(ThemeFit::Moderately)
        } else if s.eq_ignore_ascii_case("slightly fits") {
            Some(ThemeFit::Slightly)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeFit::Strongly => "Strongly Fits",
            ThemeFit::Moderately => "Moderately Fits",
            ThemeFit::Slightly => "Slightly Fits",
        }
    }
}

/// One judge's submission for one student row of a project.
///
/// Scores are per project: every student row of the same project in the same
/// submission carries the same criterion scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    #[serde(default)]
    pub serial: String,
    pub student_name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub project_title: String,
    pub project_id: String,
    pub scores: CriterionScores<Option<f64>>,
    #[serde(default)]
    pub status: Attendance,
    #[serde(default)]
    pub theme_fit: Option<ThemeFit>,
}
