use std::time::Duration;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget spent; the segment fails.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-interval retry policy. The first attempt runs immediately; every
/// further attempt waits `backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Never below 1.
    pub max_attempts: u32,
    /// Delay before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Decide what happens after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::NoRetry
        } else {
            RetryDecision::RetryAfter(self.backoff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_backoff_until_budget_spent() {
        let p = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(
            p.decide(1),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(
            p.decide(2),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(p.decide(3), RetryDecision::NoRetry);
        assert_eq!(p.decide(4), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let p = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.decide(1), RetryDecision::NoRetry);
    }
}
