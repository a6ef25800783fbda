//! Wall-clock budget for diff computation.

use std::time::{Duration, Instant};

/// A time budget threaded through every potentially long-running stage.
///
/// Stages poll [`Timeout::is_valid`] at coarse boundaries and return partial
/// results once it reports false. Expiry is never fatal.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    Infinite,
    Deadline(Instant),
}

impl Timeout {
    pub fn infinite() -> Self {
        Timeout::Infinite
    }

    /// A deadline `ms` milliseconds from now; `0` means no limit.
    pub fn from_max_duration_ms(ms: u64) -> Self {
        if ms == 0 {
            Timeout::Infinite
        } else {
            Timeout::Deadline(Instant::now() + Duration::from_millis(ms))
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Timeout::Infinite => true,
            Timeout::Deadline(deadline) => Instant::now() < *deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_is_always_valid() {
        assert!(Timeout::infinite().is_valid());
        assert!(Timeout::from_max_duration_ms(0).is_valid());
    }

    #[test]
    fn elapsed_deadline_is_invalid() {
        let t = Timeout::Deadline(Instant::now() - Duration::from_millis(1));
        assert!(!t.is_valid());
    }

    #[test]
    fn future_deadline_is_valid() {
        let t = Timeout::from_max_duration_ms(60_000);
        assert!(t.is_valid());
    }
}
