//! # aigrade
//!
//! Grades programming assignments by sending the assignment brief and the
//! student's code to an LLM provider, then parsing the tagged reply into a
//! report that can be printed or saved.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Environment-driven configuration shared across the crate
pub mod config;
/// LLM provider backends behind the `Grader` capability
pub mod grader;
/// Validation gating and the end-to-end grading flow
pub mod pipeline;
/// The grading prompt template
pub mod prompt;
/// Parsing provider replies and rendering reports
pub mod report;
/// Per-session rate limiting and usage history
pub mod session;
/// Reading assignment and solution sources, including notebooks
pub mod source;

pub use grader::{Grader, Provider, ProviderError};
pub use pipeline::{GradeError, GradingOutcome, grade_submission};
pub use prompt::build_prompt;
pub use report::{ParsedReport, Report, ReportField, ReportFormat, parse};
pub use session::GradingSession;
