#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{config::ConfigState, grader::Provider};

/// A grading was refused by the session's rate limiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The session used up its gradings.
    #[error("Session limit of {max} gradings reached. Please try again later.")]
    SessionLimitReached {
        /// Gradings allowed per session.
        max: u32,
    },
    /// The previous grading was too recent.
    #[error("Please wait {}s before the next grading.", .wait.as_secs().max(1))]
    TooSoon {
        /// Time left until the next grading is allowed.
        wait: Duration,
    },
}

/// Caps gradings per session and enforces a gap between them.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Gradings allowed per session.
    max_grades:   u32,
    /// Minimum gap between gradings.
    min_interval: Duration,
    /// Gradings admitted so far.
    admitted:     u32,
    /// When the last grading was admitted.
    last_call:    Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given budget and gap.
    pub fn new(max_grades: u32, min_interval: Duration) -> Self {
        Self {
            max_grades,
            min_interval,
            admitted: 0,
            last_call: None,
        }
    }

    /// Admits a grading at `now`, or explains why not. A refusal does not
    /// use up any budget.
    pub fn check_at(&mut self, now: Instant) -> Result<(), RateLimitError> {
        if self.admitted >= self.max_grades {
            return Err(RateLimitError::SessionLimitReached {
                max: self.max_grades,
            });
        }
        if let Some(last) = self.last_call {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return Err(RateLimitError::TooSoon {
                    wait: self.min_interval - elapsed,
                });
            }
        }

        self.admitted += 1;
        self.last_call = Some(now);
        Ok(())
    }

    /// Admits a grading now.
    pub fn check(&mut self) -> Result<(), RateLimitError> {
        self.check_at(Instant::now())
    }

    /// Gradings admitted so far.
    pub fn admitted(&self) -> u32 {
        self.admitted
    }

    /// Gradings still available.
    pub fn remaining(&self) -> u32 {
        self.max_grades.saturating_sub(self.admitted)
    }
}

/// What is remembered about one completed grading. Never holds keys or
/// submission content.
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    /// Identifier of the grading.
    pub id:               Uuid,
    /// When the grading completed.
    pub timestamp:        DateTime<Utc>,
    /// Provider that graded it.
    pub provider:         Provider,
    /// Model that graded it.
    pub model:            String,
    /// Length of the assignment brief in characters.
    pub assignment_chars: usize,
    /// Length of the solution in characters.
    pub solution_chars:   usize,
}

/// Caller-owned state that spans gradings: the rate limiter and usage
/// history.
#[derive(Debug, Clone)]
pub struct GradingSession {
    /// Rate limiter for this session.
    limiter: RateLimiter,
    /// Completed gradings, oldest first.
    history: Vec<UsageRecord>,
}

impl GradingSession {
    /// Creates a session around `limiter`.
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            history: Vec::new(),
        }
    }

    /// Creates a session with the configured limits.
    pub fn from_config(config: &ConfigState) -> Self {
        Self::new(RateLimiter::new(config.max_grades(), config.min_interval()))
    }

    /// The session's rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Mutable access to the rate limiter.
    pub fn limiter_mut(&mut self) -> &mut RateLimiter {
        &mut self.limiter
    }

    /// Completed gradings, oldest first.
    pub fn history(&self) -> &[UsageRecord] {
        &self.history
    }

    /// Appends a completed grading to the history.
    pub fn record(&mut self, record: UsageRecord) {
        self.history.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_is_always_admitted() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(3600));
        assert!(limiter.check_at(Instant::now()).is_ok());
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn calls_inside_the_interval_are_refused() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(20, Duration::from_secs(5));
        limiter.check_at(start).unwrap();

        let err = limiter.check_at(start + Duration::from_secs(2)).unwrap_err();
        assert_eq!(err, RateLimitError::TooSoon {
            wait: Duration::from_secs(3),
        });
        assert_eq!(limiter.admitted(), 1);

        assert!(limiter.check_at(start + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn budget_is_enforced_before_the_interval() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(2, Duration::ZERO);
        limiter.check_at(start).unwrap();
        limiter.check_at(start).unwrap();
        assert_eq!(
            limiter.check_at(start + Duration::from_secs(60)),
            Err(RateLimitError::SessionLimitReached { max: 2 })
        );
    }
}
