use std::{fs, path::PathBuf};

use aigrade::{
    ParsedReport, Report, ReportField, ReportFormat, parse,
    report::{NOT_AVAILABLE, render},
};
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

const FULL_REPLY: &str = "\
SCORE: 85
GRADE: B
CORRECTNESS: 35/40 - Handles the main cases
CODE_QUALITY: 20/25 - Readable, few comments
COMPLETENESS: 18/20 - Misses negative input
EFFICIENCY: 12/15 - Recursion depth grows with n
FEEDBACK: Works for small inputs.
This continuation line is not part of the field.
SUGGESTIONS: Validate input.
STRENGTHS: Clear naming.
WEAKNESSES: No tests.
";

fn stamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|d| d.and_hms_opt(14, 5, 7))
        .expect("valid timestamp")
}

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("aigrade-report-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

#[test]
fn unknown_tags_are_ignored() {
    let report = parse("SCORE: 85\nNOTE: ignore me\nGRADE: B\n");

    let mut expected = ParsedReport::new();
    expected.insert(ReportField::Score, "85");
    expected.insert(ReportField::Grade, "B");
    assert_eq!(report, expected);
    assert_eq!(report.len(), 2);
}

#[test]
fn last_occurrence_of_a_tag_wins() {
    let report = parse("SCORE: 10\nSCORE: 90\n");
    assert_eq!(report.get(ReportField::Score), Some("90"));
    assert_eq!(report.len(), 1);
}

#[test]
fn only_the_tagged_line_is_kept() {
    let report = parse(FULL_REPLY);
    assert_eq!(report.len(), 10);
    assert_eq!(report.get(ReportField::Feedback), Some("Works for small inputs."));
    assert_eq!(
        report.get(ReportField::CodeQuality),
        Some("20/25 - Readable, few comments")
    );
}

#[test]
fn untagged_reply_parses_to_nothing() {
    let report = parse("I'm sorry, I can't grade this submission.");
    assert!(report.is_empty());
    assert_eq!(report.get_or_na(ReportField::Score), NOT_AVAILABLE);
}

#[test]
fn parsed_fields_serialize_with_snake_case_keys() {
    let value = serde_json::to_value(parse("CODE_QUALITY: 20/25\nSCORE: 70")).expect("serialize");
    assert_eq!(value, serde_json::json!({"score": "70", "code_quality": "20/25"}));
}

#[test]
fn missing_fields_render_as_na() {
    let raw = "SCORE: 70\nGRADE: C\nCORRECTNESS: 30/40 - ok\n";
    let text = render(&parse(raw), raw, "brief", "code", stamp());

    assert!(text.contains("- Efficiency (15%): N/A\n"));
    assert!(text.contains("- Correctness (40%): 30/40 - ok\n"));
    assert!(text.contains("FEEDBACK:\nN/A\n"));
}

#[test]
fn structured_report_layout() {
    let raw = "SCORE: 85\nGRADE: B\nFEEDBACK: Good\nSTRENGTHS: Naming\n";
    let report = Report::builder()
        .parsed(parse(raw))
        .raw(raw)
        .assignment("Write hello world.")
        .solution("print('hello world')")
        .generated_at(stamp())
        .build();

    let expected = "\
ASSIGNMENT GRADING REPORT
Generated on: 2024-03-09 14:05:07

OVERALL SCORE: 85/100
GRADE: B

DETAILED BREAKDOWN:
- Correctness (40%): N/A
- Code Quality (25%): N/A
- Completeness (20%): N/A
- Efficiency (15%): N/A

FEEDBACK:
Good

STRENGTHS:
Naming

WEAKNESSES:
N/A

SUGGESTIONS:
N/A

ASSIGNMENT REQUIREMENTS:
Write hello world.

STUDENT SOLUTION:
print('hello world')
";
    assert_eq!(report.render(ReportFormat::Structured), expected);
}

#[test]
fn rendering_is_repeatable() {
    let first = render(&parse(FULL_REPLY), FULL_REPLY, "brief", "code", stamp());
    let second = render(&parse(FULL_REPLY), FULL_REPLY, "brief", "code", stamp());
    assert_eq!(first, second);
}

#[test]
fn raw_report_has_results_header() {
    let report = Report::builder()
        .raw("SCORE: 1")
        .assignment("a")
        .solution("s")
        .generated_at(stamp())
        .build();

    assert_eq!(
        report.render(ReportFormat::Raw),
        format!(
            "ASSIGNMENT GRADING RESULTS\nGenerated on: 2024-03-09 14:05:07\n{}\n\nSCORE: 1",
            "=".repeat(50)
        )
    );
}

#[test]
fn persist_writes_file_and_overwrites() {
    let root = temp_root();
    let path = root.join("grading_results.txt");
    fs::write(&path, "stale").expect("seed file");

    let report = Report::builder()
        .parsed(parse(FULL_REPLY))
        .raw(FULL_REPLY)
        .assignment("a")
        .solution("s")
        .generated_at(stamp())
        .build();

    let written = report.persist(&path, ReportFormat::Structured).expect("persist");
    assert_eq!(written, path);
    assert_eq!(fs::read_to_string(&path).expect("read back"), report.render_structured());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn persist_into_directory_uses_timestamped_name() {
    let root = temp_root();
    let report = Report::builder()
        .raw("SCORE: 1")
        .assignment("a")
        .solution("s")
        .generated_at(stamp())
        .build();

    let written = report.persist(&root, ReportFormat::Raw).expect("persist");
    assert_eq!(written, root.join("grading_report_20240309_140507.txt"));
    assert!(written.is_file());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn report_format_parses_from_cli_values() {
    assert_eq!("structured".parse::<ReportFormat>(), Ok(ReportFormat::Structured));
    assert_eq!(" RAW ".parse::<ReportFormat>(), Ok(ReportFormat::Raw));
    assert!("pdf".parse::<ReportFormat>().is_err());
}
