#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Prompt sent to check that a provider accepts the configured credentials.
pub const CONNECTION_PROBE: &str = "Say 'API key is working correctly'";

/// Weighted rubric categories, in the order the prompt lists them.
pub const RUBRIC: [(&str, u8); 4] = [
    ("Correctness", 40),
    ("Code Quality", 25),
    ("Completeness", 20),
    ("Efficiency", 15),
];

/// Renders the grading prompt for an assignment brief and a student solution.
///
/// Both inputs are embedded verbatim. The reply format requested here is the
/// one [`crate::report::parse`] understands, so the tag spellings in
/// `prompts/grading.md` must stay in step with [`crate::report::ReportField`].
pub fn build_prompt(assignment: &str, solution: &str) -> String {
    format!(include_str!("prompts/grading.md"), assignment = assignment, solution = solution)
}
