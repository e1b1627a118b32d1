#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use bon::Builder;
use chrono::NaiveDateTime;

use super::{ParsedReport, ReportField as F};

/// Timestamp layout used inside reports.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamp layout used in generated report file names.
const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Which layout to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Field-by-field report followed by both inputs.
    Structured,
    /// The provider reply under a short header.
    #[default]
    Raw,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(ReportFormat::Structured),
            "raw" => Ok(ReportFormat::Raw),
            other => Err(format!("unknown report format `{other}` (expected structured or raw)")),
        }
    }
}

/// Everything needed to render the outcome of one grading.
#[derive(Debug, Clone, Builder)]
#[builder(on(String, into))]
pub struct Report {
    /// Fields recovered from the reply.
    #[builder(default)]
    parsed:       ParsedReport,
    /// The reply as received.
    raw:          String,
    /// Assignment brief that was graded against.
    assignment:   String,
    /// Student solution that was graded.
    solution:     String,
    /// Local time the report was generated.
    generated_at: NaiveDateTime,
}

impl Report {
    /// Fields recovered from the reply.
    pub fn parsed(&self) -> &ParsedReport {
        &self.parsed
    }

    /// The reply as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Assignment brief that was graded against.
    pub fn assignment(&self) -> &str {
        &self.assignment
    }

    /// Student solution that was graded.
    pub fn solution(&self) -> &str {
        &self.solution
    }

    /// Local generation time.
    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    /// Renders in the requested layout.
    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Structured => self.render_structured(),
            ReportFormat::Raw => self.render_raw(),
        }
    }

    /// Field-by-field report with `N/A` for anything the reply left out.
    pub fn render_structured(&self) -> String {
        render(&self.parsed, &self.raw, &self.assignment, &self.solution, self.generated_at)
    }

    /// The reply under a results header.
    pub fn render_raw(&self) -> String {
        format!(
            "ASSIGNMENT GRADING RESULTS\nGenerated on: {}\n{}\n\n{}",
            self.generated_at.format(TIMESTAMP_FORMAT),
            "=".repeat(50),
            self.raw
        )
    }

    /// Default file name for this report.
    pub fn file_name(&self) -> String {
        format!("grading_report_{}.txt", self.generated_at.format(FILE_STAMP_FORMAT))
    }

    /// Writes the report to `path`, replacing any existing file. When `path`
    /// is a directory the report goes to [`Report::file_name`] inside it.
    /// Returns the path written.
    pub fn persist(&self, path: impl AsRef<Path>, format: ReportFormat) -> Result<PathBuf> {
        let path = path.as_ref();
        let target = if path.is_dir() {
            path.join(self.file_name())
        } else {
            path.to_path_buf()
        };

        std::fs::write(&target, self.render(format))
            .with_context(|| format!("Could not write report to {}", target.display()))?;
        tracing::info!("Results saved to: {}", target.display());
        Ok(target)
    }
}

/// Renders the structured report layout.
///
/// `raw` is accepted for symmetry with [`Report`]; the structured layout is
/// built from `parsed` alone, followed by both inputs verbatim.
pub fn render(
    parsed: &ParsedReport,
    _raw: &str,
    assignment: &str,
    solution: &str,
    timestamp: NaiveDateTime,
) -> String {
    let na = |field| parsed.get_or_na(field);

    format!(
        "ASSIGNMENT GRADING REPORT\n\
         Generated on: {stamp}\n\
         \n\
         OVERALL SCORE: {score}/100\n\
         GRADE: {grade}\n\
         \n\
         DETAILED BREAKDOWN:\n\
         - Correctness (40%): {correctness}\n\
         - Code Quality (25%): {code_quality}\n\
         - Completeness (20%): {completeness}\n\
         - Efficiency (15%): {efficiency}\n\
         \n\
         FEEDBACK:\n\
         {feedback}\n\
         \n\
         STRENGTHS:\n\
         {strengths}\n\
         \n\
         WEAKNESSES:\n\
         {weaknesses}\n\
         \n\
         SUGGESTIONS:\n\
         {suggestions}\n\
         \n\
         ASSIGNMENT REQUIREMENTS:\n\
         {assignment}\n\
         \n\
         STUDENT SOLUTION:\n\
         {solution}\n",
        stamp = timestamp.format(TIMESTAMP_FORMAT),
        score = na(F::Score),
        grade = na(F::Grade),
        correctness = na(F::Correctness),
        code_quality = na(F::CodeQuality),
        completeness = na(F::Completeness),
        efficiency = na(F::Efficiency),
        feedback = na(F::Feedback),
        strengths = na(F::Strengths),
        weaknesses = na(F::Weaknesses),
        suggestions = na(F::Suggestions),
    )
}
