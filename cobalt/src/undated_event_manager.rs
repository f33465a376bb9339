//! Holds events logged while the system clock is still inaccurate and
//! replays them once the clock is validated.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

use crate::status::{Status, StatusCode};
use crate::types::Event;

struct SavedEvent {
    event: Event,
    metric_id: u32,
    logged_at: Instant,
}

/// A finite bounded queue of events awaiting a trustworthy clock.
///
/// Once [`flush`](Self::flush) has run, the manager refuses further saves:
/// there is exactly one replay pass per process lifetime, matching the
/// "clock transitions to accurate" event it's built around.
pub struct UndatedEventManager {
    capacity: usize,
    queue: Mutex<Option<VecDeque<SavedEvent>>>,
}

impl UndatedEventManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: Mutex::new(Some(VecDeque::new())),
        }
    }

    /// Stores `event` for later replay. Returns `StoreFull` once `capacity`
    /// saved events are already queued, `AlreadyFlushed` if `flush` has
    /// already run.
    pub fn save(&self, event: Event, metric_id: u32, logged_at: Instant) -> Status {
        let mut guard = self.queue.lock().expect("undated event manager lock poisoned");
        match guard.as_mut() {
            None => Status::new(StatusCode::AlreadyFlushed, "undated event manager already flushed"),
            Some(queue) if queue.len() >= self.capacity => {
                Status::new(StatusCode::StoreFull, "undated event queue is full")
            }
            Some(queue) => {
                queue.push_back(SavedEvent { event, metric_id, logged_at });
                Status::ok()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .expect("undated event manager lock poisoned")
            .as_ref()
            .map(|q| q.len())
            .unwrap_or(0)
    }

    pub fn is_flushed(&self) -> bool {
        self.queue
            .lock()
            .expect("undated event manager lock poisoned")
            .is_none()
    }

    /// Replays every saved event in insertion order through `replay`, which
    /// is handed `(metric_id, event, approximate_log_time)` — `now` minus
    /// the monotonic elapsed time since `save` was called, i.e. a
    /// retrospective estimate of the wall-clock time the event actually
    /// occurred at. After this call the manager is flushed
    /// and every further `save` fails with `AlreadyFlushed`.
    pub fn flush<F>(&self, now: SystemTime, mut replay: F) -> Status
    where
        F: FnMut(u32, Event, SystemTime) -> Status,
    {
        let queue = {
            let mut guard = self.queue.lock().expect("undated event manager lock poisoned");
            match guard.take() {
                Some(queue) => queue,
                None => return Status::new(StatusCode::AlreadyFlushed, "undated event manager already flushed"),
            }
        };
        let flush_instant = Instant::now();
        let mut worst = Status::ok();
        for saved in queue {
            let elapsed = flush_instant.saturating_duration_since(saved.logged_at);
            let approximate_log_time = now.checked_sub(elapsed).unwrap_or(now);
            let status = replay(saved.metric_id, saved.event, approximate_log_time);
            worst = worst.worst(status);
        }
        worst
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::Event;
    use std::time::Duration;

    fn occurrence() -> Event {
        Event::Occurrence { event_codes: vec![1] }
    }

    #[test_log::test]
    fn save_then_flush_replays_in_order() {
        let manager = UndatedEventManager::new(10);
        assert!(manager.save(occurrence(), 1, Instant::now()).is_ok());
        assert!(manager.save(occurrence(), 2, Instant::now()).is_ok());

        let mut seen = Vec::new();
        let status = manager.flush(SystemTime::now(), |metric_id, _event, _time| {
            seen.push(metric_id);
            Status::ok()
        });
        assert!(status.is_ok());
        assert_eq!(seen, vec![1, 2]);
    }

    #[test_log::test]
    fn save_after_flush_is_rejected() {
        let manager = UndatedEventManager::new(10);
        manager.flush(SystemTime::now(), |_, _, _| Status::ok());
        let status = manager.save(occurrence(), 1, Instant::now());
        assert_eq!(status.code(), StatusCode::AlreadyFlushed);
    }

    #[test_log::test]
    fn flush_twice_returns_already_flushed_the_second_time() {
        let manager = UndatedEventManager::new(10);
        manager.save(occurrence(), 1, Instant::now());
        let first = manager.flush(SystemTime::now(), |_, _, _| Status::ok());
        assert!(first.is_ok());
        let second = manager.flush(SystemTime::now(), |_, _, _| Status::ok());
        assert_eq!(second.code(), StatusCode::AlreadyFlushed);
    }

    #[test_log::test]
    fn queue_rejects_beyond_capacity() {
        let manager = UndatedEventManager::new(1);
        assert!(manager.save(occurrence(), 1, Instant::now()).is_ok());
        let status = manager.save(occurrence(), 2, Instant::now());
        assert_eq!(status.code(), StatusCode::StoreFull);
        assert_eq!(manager.len(), 1);
    }

    #[test_log::test]
    fn flush_estimates_log_time_from_elapsed_monotonic_duration() {
        let manager = UndatedEventManager::new(10);
        let logged_at = Instant::now();
        manager.save(occurrence(), 1, logged_at);
        std::thread::sleep(Duration::from_millis(5));

        let now = SystemTime::now();
        let mut observed = None;
        manager.flush(now, |_, _, approximate_log_time| {
            observed = Some(approximate_log_time);
            Status::ok()
        });
        let observed = observed.expect("replay was called");
        assert!(observed <= now);
    }
}
