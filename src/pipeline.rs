#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, path::Path, time::Instant};

use chrono::{Local, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    grader::{Grader, Provider, ProviderError},
    prompt::build_prompt,
    report::{Report, ResponseParser, TagLineParser},
    session::{GradingSession, RateLimitError, UsageRecord},
    source::{self, SourceError},
};

/// Which input was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The assignment brief.
    Assignment,
    /// The student solution.
    Solution,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Assignment => f.write_str("assignment requirements"),
            InputKind::Solution => f.write_str("student solution"),
        }
    }
}

/// Reasons a grading request did not produce a report.
#[derive(Error, Debug)]
pub enum GradeError {
    /// An input was empty after trimming. The provider was not called.
    #[error("Please provide {0}!")]
    InputMissing(InputKind),
    /// An input could not be loaded.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The session refused the grading. The provider was not called.
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A finished grading.
#[derive(Debug, Clone)]
pub struct GradingOutcome {
    /// The report, ready to render.
    pub report:   Report,
    /// Provider that graded the submission.
    pub provider: Provider,
    /// Model that graded the submission.
    pub model:    String,
    /// Identifier of the grading in the session history.
    pub id:       Uuid,
}

/// Rejects empty or whitespace-only inputs.
pub fn validate(assignment: &str, solution: &str) -> Result<(), GradeError> {
    if assignment.trim().is_empty() {
        return Err(GradeError::InputMissing(InputKind::Assignment));
    }
    if solution.trim().is_empty() {
        return Err(GradeError::InputMissing(InputKind::Solution));
    }
    Ok(())
}

/// Grades a submission with the tag-line reply parser.
pub async fn grade_submission(
    grader: &dyn Grader,
    session: &mut GradingSession,
    assignment: &str,
    solution: &str,
) -> Result<GradingOutcome, GradeError> {
    grade_submission_with(grader, &TagLineParser, session, assignment, solution).await
}

/// Reads the brief and the solution from disk, then grades them. The
/// solution is read with [`source::load_solution`], so notebooks are reduced
/// to their code cells.
pub async fn grade_files(
    grader: &dyn Grader,
    session: &mut GradingSession,
    assignment: &Path,
    solution: &Path,
) -> Result<GradingOutcome, GradeError> {
    let assignment = source::read_text_file(assignment)?;
    let solution = source::load_solution(solution)?;
    tracing::debug!(
        "Loaded {} assignment chars and {} solution chars",
        assignment.chars().count(),
        solution.chars().count()
    );
    grade_submission(grader, session, &assignment, &solution).await
}

/// Grades a submission: validate, check the session limits, prompt the
/// provider once, then parse its reply.
///
/// Nothing is sent to the provider unless both inputs are present and the
/// session admits the call.
pub async fn grade_submission_with(
    grader: &dyn Grader,
    parser: &dyn ResponseParser,
    session: &mut GradingSession,
    assignment: &str,
    solution: &str,
) -> Result<GradingOutcome, GradeError> {
    validate(assignment, solution)?;
    session.limiter_mut().check_at(Instant::now())?;

    let prompt = build_prompt(assignment, solution);
    tracing::info!("Sending to {} ({}) for grading...", grader.provider(), grader.model());

    let raw = grader.grade(&prompt).await.inspect_err(|err| {
        tracing::warn!("Grading failed: {err}");
    })?;

    let parsed = parser.parse(&raw);
    if parsed.is_empty() {
        tracing::warn!("The reply contained none of the expected tags");
    } else {
        tracing::debug!("Recovered {} report fields", parsed.len());
    }

    let id = Uuid::new_v4();
    session.record(UsageRecord {
        id,
        timestamp: Utc::now(),
        provider: grader.provider(),
        model: grader.model().to_string(),
        assignment_chars: assignment.chars().count(),
        solution_chars: solution.chars().count(),
    });

    let report = Report::builder()
        .parsed(parsed)
        .raw(raw)
        .assignment(assignment)
        .solution(solution)
        .generated_at(Local::now().naive_local())
        .build();

    Ok(GradingOutcome {
        report,
        provider: grader.provider(),
        model: grader.model().to_string(),
        id,
    })
}
