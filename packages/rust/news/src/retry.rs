//! Bounded-attempt state machine for the news fetch.
//!
//! ```text
//! Attempting(n) ──ok──────────────▶ Success
//!       │ ──rate limited, n < max──▶ Backoff(n) ──sleep──▶ Attempting(n + 1)
//!       │ ──rate limited, n = max──▶ Exhausted(n)
//!       └ ──other status───────────▶ PermanentFailure(status)
//! ```
//!
//! The backoff is a fixed duration; it never grows between attempts.

use searchagent_shared::NewsItem;

/// What a single HTTP attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// Success status with the parsed article list (possibly empty).
    Articles(Vec<NewsItem>),
    /// The provider answered with its rate-limit status.
    RateLimited,
    /// Any other non-success status.
    Status(u16),
}

/// Position of a fetch in its retry loop. Attempts are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    Attempting(u32),
    Backoff(u32),
    Success(Vec<NewsItem>),
    PermanentFailure(u16),
    Exhausted(u32),
}

impl FetchState {
    /// Transition out of `Attempting(attempt)` given the attempt's outcome.
    pub(crate) fn after_attempt(attempt: u32, outcome: AttemptOutcome, max_attempts: u32) -> Self {
        match outcome {
            AttemptOutcome::Articles(items) => Self::Success(items),
            AttemptOutcome::Status(status) => Self::PermanentFailure(status),
            AttemptOutcome::RateLimited if attempt >= max_attempts => Self::Exhausted(attempt),
            AttemptOutcome::RateLimited => Self::Backoff(attempt),
        }
    }

    /// Whether the loop has reached a state it cannot leave.
    #[cfg(test)]
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success(_) | Self::PermanentFailure(_) | Self::Exhausted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_below_max_backs_off() {
        let next = FetchState::after_attempt(1, AttemptOutcome::RateLimited, 5);
        assert_eq!(next, FetchState::Backoff(1));
        assert!(!next.is_terminal());
    }

    #[test]
    fn rate_limit_at_max_is_exhausted() {
        let next = FetchState::after_attempt(5, AttemptOutcome::RateLimited, 5);
        assert_eq!(next, FetchState::Exhausted(5));
        assert!(next.is_terminal());
    }

    #[test]
    fn other_status_is_permanent_on_any_attempt() {
        assert_eq!(
            FetchState::after_attempt(1, AttemptOutcome::Status(500), 5),
            FetchState::PermanentFailure(500)
        );
        assert_eq!(
            FetchState::after_attempt(4, AttemptOutcome::Status(401), 5),
            FetchState::PermanentFailure(401)
        );
    }

    #[test]
    fn articles_succeed_even_when_empty() {
        let next = FetchState::after_attempt(2, AttemptOutcome::Articles(vec![]), 5);
        assert_eq!(next, FetchState::Success(vec![]));
        assert!(next.is_terminal());
    }

    #[test]
    fn single_attempt_budget_never_backs_off() {
        let next = FetchState::after_attempt(1, AttemptOutcome::RateLimited, 1);
        assert_eq!(next, FetchState::Exhausted(1));
    }
}
