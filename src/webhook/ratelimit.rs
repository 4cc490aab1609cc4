//! Token bucket rate limiter: continuous refill, drop rather than
//! queue on exhaustion — a webhook send that can't get a token now is
//! simply not sent, since this process won't be around long enough to
//! retry later on its own.

use std::sync::Mutex;
use std::time::Instant;

pub struct TokenBucket {
    state: Mutex<BucketState>,
    rate_per_minute: f64,
    capacity: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_minute: f64, capacity: f64) -> Self {
        Self {
            state: Mutex::new(BucketState { tokens: capacity, last_refill: Instant::now() }),
            rate_per_minute,
            capacity,
        }
    }

    /// Attempt to take one token. Returns `false` if the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        let elapsed_secs = now.duration_since(state.last_refill).as_secs_f64();
        let refill = elapsed_secs * (self.rate_per_minute / 60.0);
        state.tokens = (state.tokens + refill).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
