//! Small ambient helpers shared across modules.

use std::sync::atomic::{AtomicU64, Ordering};

/// Logs the first `limit` warnings it's given, then silently counts the
/// rest, so logging itself doesn't become a source of unbounded growth.
/// Intended for fields fired from per-event code paths, where an
/// unthrottled `warn!` could flood logs under sustained bad input.
pub struct RateLimitedLogger {
    limit: u64,
    seen: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            seen: AtomicU64::new(0),
        }
    }

    /// Logs `message` at `warn` if fewer than `limit` messages have been
    /// logged so far; otherwise just bumps the suppressed count.
    pub fn warn(&self, message: &str) {
        let count = self.seen.fetch_add(1, Ordering::Relaxed);
        if count < self.limit {
            log::warn!("{message}");
        } else if count == self.limit {
            log::warn!("suppressing further warnings of this kind (limit {})", self.limit);
        }
    }

    pub fn suppressed_count(&self) -> u64 {
        self.seen.load(Ordering::Relaxed).saturating_sub(self.limit)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn suppresses_after_limit() {
        let logger = RateLimitedLogger::new(2);
        logger.warn("one");
        logger.warn("two");
        logger.warn("three");
        logger.warn("four");
        assert_eq!(logger.suppressed_count(), 2);
    }
}
