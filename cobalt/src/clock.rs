//! Wall-clock time, day-index math, and the clock-accuracy gate that feeds
//! the UndatedEventManager.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds per day index bucket.
const SECONDS_PER_DAY: i64 = 86_400;

/// A metric's declared time zone policy. Only UTC and a fixed local offset
/// are supported; the source's tz database integration is out of scope
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZone {
    Utc,
    Local,
}

/// Supplies wall-clock time and computes day indices in a declared time zone.
///
/// Kept as a trait (rather than calling `SystemTime::now()` directly) so
/// tests can inject a fixed or stepped clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    /// Local-time offset from UTC, in seconds. A fixed offset stands in for
    /// full tz-database support (out of scope).
    fn local_offset_seconds(&self) -> i64 {
        0
    }

    fn day_index(&self, time: SystemTime, tz: TimeZone) -> u32 {
        let unix_seconds = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs() as i64;
        let offset = match tz {
            TimeZone::Utc => 0,
            TimeZone::Local => self.local_offset_seconds(),
        };
        ((unix_seconds + offset).div_euclid(SECONDS_PER_DAY)) as u32
    }

    fn current_day_index(&self, tz: TimeZone) -> u32 {
        self.day_index(self.now(), tz)
    }
}

/// The default clock: real wall time, zero local offset (UTC fallback when
/// no per-device offset is configured).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub local_offset_seconds: i64,
}

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn local_offset_seconds(&self) -> i64 {
        self.local_offset_seconds
    }
}

/// Whether the system clock is currently trustworthy. On many embedded and
/// freshly-booted devices the clock reads long before NTP sync completes;
/// events logged during that window are diverted to the UndatedEventManager
/// rather than stamped with a bogus day index.
pub trait ClockValidator: Send + Sync {
    fn is_accurate(&self) -> bool;
}

/// A validator that flips from inaccurate to accurate exactly once, useful
/// for tests and for the common "clock is unknown until first NTP sync"
/// case.
pub struct LatchingClockValidator {
    accurate: std::sync::atomic::AtomicBool,
}

impl LatchingClockValidator {
    pub fn new(initially_accurate: bool) -> Self {
        Self {
            accurate: std::sync::atomic::AtomicBool::new(initially_accurate),
        }
    }

    pub fn mark_accurate(&self) {
        self.accurate
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl ClockValidator for LatchingClockValidator {
    fn is_accurate(&self) -> bool {
        self.accurate.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct FixedClock(SystemTime);
    impl Clock for FixedClock {
        fn now(&self) -> SystemTime {
            self.0
        }
    }

    #[test_log::test]
    fn day_index_is_floor_division_by_86400() {
        let clock = FixedClock(UNIX_EPOCH + Duration::from_secs(86_400 * 3 + 1));
        assert_eq!(clock.current_day_index(TimeZone::Utc), 3);
    }

    #[test_log::test]
    fn day_index_at_exact_boundary() {
        let clock = FixedClock(UNIX_EPOCH + Duration::from_secs(86_400 * 5));
        assert_eq!(clock.current_day_index(TimeZone::Utc), 5);
    }

    #[test_log::test]
    fn local_offset_shifts_day_index() {
        struct OffsetClock(SystemTime);
        impl Clock for OffsetClock {
            fn now(&self) -> SystemTime {
                self.0
            }
            fn local_offset_seconds(&self) -> i64 {
                -3600 * 10 // UTC-10
            }
        }
        // 5 seconds into day 10 UTC, but still day 9 ten hours west.
        let clock = OffsetClock(UNIX_EPOCH + Duration::from_secs(86_400 * 10 + 5));
        assert_eq!(clock.current_day_index(TimeZone::Utc), 10);
        assert_eq!(clock.current_day_index(TimeZone::Local), 9);
    }

    #[test_log::test]
    fn latching_validator_flips_once() {
        let validator = LatchingClockValidator::new(false);
        assert!(!validator.is_accurate());
        validator.mark_accurate();
        assert!(validator.is_accurate());
    }
}
