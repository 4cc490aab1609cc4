//! Circuit breaker: closed → open → half-open → closed/open.
//!
//! Closed: requests pass, failures counted against `failure_threshold`.
//! Open: requests rejected outright until `open_timeout` elapses.
//! Half-open: a single probe is allowed through; `success_threshold`
//! consecutive successes close the circuit, any failure reopens it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    success_threshold: u32,
    open_timeout: Duration,
}

/// What the caller should do, returned by [`CircuitBreaker::try_acquire`].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, success_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
            failure_threshold,
            success_threshold,
            open_timeout,
        }
    }

    pub fn try_acquire(&self) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Closed => Admission::Allowed,
            State::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.open_timeout {
                    inner.state = State::HalfOpen;
                    inner.half_open_probe_in_flight = true;
                    inner.consecutive_successes = 0;
                    Admission::Allowed
                } else {
                    Admission::Rejected
                }
            }
            State::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    Admission::Rejected
                } else {
                    inner.half_open_probe_in_flight = true;
                    Admission::Allowed
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.half_open_probe_in_flight = false;
        inner.consecutive_failures = 0;
        match inner.state {
            State::Closed => {}
            State::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.success_threshold {
                    inner.state = State::Closed;
                    inner.consecutive_successes = 0;
                }
            }
            State::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.half_open_probe_in_flight = false;
        inner.consecutive_successes = 0;
        match inner.state {
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(3, 2, Duration::from_secs(30));
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.try_acquire(), Admission::Allowed);
        cb.record_failure();
        assert_eq!(cb.try_acquire(), Admission::Rejected);
    }

    #[test]
    fn test_half_open_after_timeout() {
        let cb = CircuitBreaker::new(1, 1, Duration::from_millis(20));
        cb.record_failure();
        assert_eq!(cb.try_acquire(), Admission::Rejected);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cb.try_acquire(), Admission::Allowed);
    }

    #[test]
    fn test_half_open_success_closes_circuit() {
        let cb = CircuitBreaker::new(1, 1, Duration::from_millis(10));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cb.try_acquire(), Admission::Allowed);
        cb.record_success();
        assert_eq!(cb.try_acquire(), Admission::Allowed);
        assert_eq!(cb.try_acquire(), Admission::Allowed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new(1, 1, Duration::from_millis(10));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(cb.try_acquire(), Admission::Allowed);
        cb.record_failure();
        assert_eq!(cb.try_acquire(), Admission::Rejected);
    }
}
