//! Bounded retry state for self-correction loops
//!
//! The bound is a value, not a counter buried in loop state:
//! - `attempt` starts at 0 (the first try is not a retry)
//! - `next()` yields `None` once `attempt == max`
//! - A loop driven by `next()` runs at most `max + 1` times

/// Retry bound carried by value through an agent pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u8,
    pub max: u8,
}

impl RetryState {
    pub fn new(max: u8) -> Self {
        Self { attempt: 0, max }
    }

    /// Whether another retry is allowed
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max
    }

    /// State for the next retry, or `None` when the bound is reached
    pub fn next(self) -> Option<Self> {
        self.can_retry().then(|| Self {
            attempt: self.attempt + 1,
            max: self.max,
        })
    }

    pub fn is_exhausted(&self) -> bool {
        !self.can_retry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_bound() {
        let mut state = RetryState::new(2);
        let mut runs = 1;
        while let Some(next) = state.next() {
            state = next;
            runs += 1;
        }
        assert_eq!(runs, 3);
        assert_eq!(state.attempt, 2);
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_zero_retries() {
        let state = RetryState::new(0);
        assert!(state.is_exhausted());
        assert!(state.next().is_none());
    }
}
