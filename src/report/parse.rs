#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{ParsedReport, ReportField};

/// Turns a provider reply into report fields.
///
/// Implementations must not fail: a reply they cannot make sense of yields
/// an empty report.
pub trait ResponseParser: Send + Sync {
    /// Parses `raw` into whatever fields it can recover.
    fn parse(&self, raw: &str) -> ParsedReport;
}

/// Parser for the `TAG: value` line format requested by the grading prompt.
///
/// Only the line carrying a tag contributes to a field; continuation lines
/// are dropped. A repeated tag overwrites the earlier value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagLineParser;

impl TagLineParser {
    /// Matches a single trimmed line against the known tags.
    fn match_line(line: &str) -> Option<(ReportField, &str)> {
        ReportField::ALL.iter().find_map(|&field| {
            line.strip_prefix(field.tag())
                .map(|rest| (field, rest.trim()))
        })
    }
}

impl ResponseParser for TagLineParser {
    fn parse(&self, raw: &str) -> ParsedReport {
        let mut report = ParsedReport::new();
        for line in raw.split('\n') {
            if let Some((field, value)) = Self::match_line(line.trim()) {
                report.insert(field, value);
            }
        }
        report
    }
}

/// Parses a reply with [`TagLineParser`].
pub fn parse(raw: &str) -> ParsedReport {
    TagLineParser.parse(raw)
}
