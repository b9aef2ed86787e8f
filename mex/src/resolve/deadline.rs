use crate::error::{MexError, MexResult};
use std::time::{Duration, Instant};

/// The single timeout budget of one resolution call
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    budget: Duration,
    expires_at: Instant,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            budget,
            expires_at: Instant::now() + budget,
        }
    }

    /// Time left, or `Timeout` once the budget is spent
    pub fn remaining(&self) -> MexResult<Duration> {
        let remaining = self.expires_at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(self.expired());
        }
        Ok(remaining)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn expired(&self) -> MexError {
        MexError::Timeout {
            budget: self.budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_has_budget() {
        let deadline = Deadline::start(Duration::from_secs(60));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().unwrap() <= Duration::from_secs(60));
    }

    #[test]
    fn test_spent_deadline_times_out() {
        let deadline = Deadline::start(Duration::ZERO);
        assert!(deadline.is_expired());
        assert!(matches!(
            deadline.remaining(),
            Err(MexError::Timeout { budget }) if budget.is_zero()
        ));
    }
}
