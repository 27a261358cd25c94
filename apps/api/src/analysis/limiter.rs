//! Admission control for in-flight analyses.
//!
//! A single atomic counter bounded by `max_concurrent`. `try_acquire` never
//! blocks or queues; callers that are refused must retry. The last
//! `reserved_for_priority` slots only go to high-priority requests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::request::Priority;

#[derive(Debug)]
pub struct ConcurrencyLimiter {
    in_flight: AtomicUsize,
    max_concurrent: usize,
    reserved_for_priority: usize,
}

impl ConcurrencyLimiter {
    /// The reservation is capped so at least one slot stays open to everyone.
    pub fn new(max_concurrent: usize, reserved_for_priority: usize) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_concurrent,
            reserved_for_priority: reserved_for_priority.min(max_concurrent.saturating_sub(1)),
        }
    }

    pub fn try_acquire(&self, priority: Priority) -> Option<AnalysisPermit<'_>> {
        let ceiling = if priority.is_high() {
            self.max_concurrent
        } else {
            self.max_concurrent - self.reserved_for_priority
        };

        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < ceiling).then_some(current + 1)
            })
            .ok()
            .map(|_| AnalysisPermit { limiter: self })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    fn release_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A held slot. Released when dropped.
#[derive(Debug)]
pub struct AnalysisPermit<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl AnalysisPermit<'_> {
    #[cfg(test)]
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AnalysisPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release_slot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_plus_one_acquire_fails_until_release() {
        let limiter = ConcurrencyLimiter::new(3, 0);
        let priority = Priority::default();

        let mut permits: Vec<_> = (0..3)
            .map(|i| {
                limiter
                    .try_acquire(priority)
                    .unwrap_or_else(|| panic!("acquire {i} should succeed"))
            })
            .collect();
        assert_eq!(limiter.in_flight(), 3);
        assert!(limiter.try_acquire(priority).is_none());

        permits.pop().unwrap().release();
        assert_eq!(limiter.in_flight(), 2);
        assert!(limiter.try_acquire(priority).is_some());
    }

    #[test]
    fn test_dropping_permit_releases_slot() {
        let limiter = ConcurrencyLimiter::new(1, 0);
        {
            let _permit = limiter.try_acquire(Priority::default()).unwrap();
            assert!(limiter.try_acquire(Priority::default()).is_none());
        }
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_reserved_slots_only_for_high_priority() {
        let limiter = ConcurrencyLimiter::new(2, 1);
        let low = Priority::new(3);
        let high = Priority::new(9);

        let _first = limiter.try_acquire(low).unwrap();
        assert!(limiter.try_acquire(low).is_none(), "last slot is reserved");
        let _second = limiter.try_acquire(high).unwrap();
        assert!(limiter.try_acquire(high).is_none());
    }

    #[test]
    fn test_reservation_leaves_one_open_slot() {
        let limiter = ConcurrencyLimiter::new(1, 5);
        assert!(limiter.try_acquire(Priority::new(1)).is_some());
    }

    #[test]
    fn test_concurrent_acquires_never_exceed_max() {
        let limiter = ConcurrencyLimiter::new(4, 0);
        let granted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    scope.spawn(|| {
                        // leak the permit so the slot stays held for the count
                        limiter
                            .try_acquire(Priority::default())
                            .map(std::mem::forget)
                            .is_some()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(false))
                .filter(|granted| *granted)
                .count()
        });
        assert_eq!(granted, 4);
        assert_eq!(limiter.in_flight(), 4);
    }
}
