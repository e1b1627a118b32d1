#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The tagged reply format, parsed into fields and rendered as reports.

/// Line-oriented parsing of provider replies.
pub mod parse;
/// Report layouts and persistence.
pub mod render;

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

pub use parse::{ResponseParser, TagLineParser, parse};
pub use render::{Report, ReportFormat, render};

/// Placeholder shown for fields the provider did not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Fields of a grading reply, in the order the prompt requests them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportField {
    /// Overall score out of 100.
    Score,
    /// Letter grade.
    Grade,
    /// Correctness assessment (40%).
    Correctness,
    /// Code quality assessment (25%).
    CodeQuality,
    /// Completeness assessment (20%).
    Completeness,
    /// Efficiency assessment (15%).
    Efficiency,
    /// Detailed feedback.
    Feedback,
    /// Suggested improvements.
    Suggestions,
    /// What the student did well.
    Strengths,
    /// Areas needing improvement.
    Weaknesses,
}

impl ReportField {
    /// Every field, in prompt order.
    pub const ALL: [ReportField; 10] = [
        ReportField::Score,
        ReportField::Grade,
        ReportField::Correctness,
        ReportField::CodeQuality,
        ReportField::Completeness,
        ReportField::Efficiency,
        ReportField::Feedback,
        ReportField::Suggestions,
        ReportField::Strengths,
        ReportField::Weaknesses,
    ];

    /// Line prefix that introduces this field in a reply.
    pub fn tag(self) -> &'static str {
        match self {
            ReportField::Score => "SCORE:",
            ReportField::Grade => "GRADE:",
            ReportField::Correctness => "CORRECTNESS:",
            ReportField::CodeQuality => "CODE_QUALITY:",
            ReportField::Completeness => "COMPLETENESS:",
            ReportField::Efficiency => "EFFICIENCY:",
            ReportField::Feedback => "FEEDBACK:",
            ReportField::Suggestions => "SUGGESTIONS:",
            ReportField::Strengths => "STRENGTHS:",
            ReportField::Weaknesses => "WEAKNESSES:",
        }
    }

    /// Snake-case key of this field.
    pub fn key(self) -> &'static str {
        match self {
            ReportField::Score => "score",
            ReportField::Grade => "grade",
            ReportField::Correctness => "correctness",
            ReportField::CodeQuality => "code_quality",
            ReportField::Completeness => "completeness",
            ReportField::Efficiency => "efficiency",
            ReportField::Feedback => "feedback",
            ReportField::Suggestions => "suggestions",
            ReportField::Strengths => "strengths",
            ReportField::Weaknesses => "weaknesses",
        }
    }
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fields recovered from a reply. Missing fields are absent, not empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedReport {
    /// Recovered values keyed by field.
    fields: BTreeMap<ReportField, String>,
}

impl ParsedReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `field`, if the reply contained it.
    pub fn get(&self, field: ReportField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Returns the value of `field`, or [`NOT_AVAILABLE`].
    pub fn get_or_na(&self, field: ReportField) -> &str {
        self.get(field).unwrap_or(NOT_AVAILABLE)
    }

    /// Returns true if the reply contained `field`.
    pub fn contains(&self, field: ReportField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Sets `field`, replacing any earlier value.
    pub fn insert(&mut self, field: ReportField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field was recovered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Present fields, in prompt order.
    pub fn iter(&self) -> impl Iterator<Item = (ReportField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    /// One table row per field, with [`NOT_AVAILABLE`] for gaps.
    pub fn rows(&self) -> Vec<FieldRow> {
        ReportField::ALL
            .iter()
            .map(|&field| FieldRow {
                field: field.key().to_string(),
                value: self.get_or_na(field).to_string(),
            })
            .collect()
    }
}

/// A field/value pair for terminal tables.
#[derive(Tabled, Clone, Debug)]
pub struct FieldRow {
    /// Field key.
    #[tabled(rename = "Field")]
    pub field: String,
    /// Field value or `N/A`.
    #[tabled(rename = "Value")]
    pub value: String,
}
