//! Bounded, jittered reconnect policy for the subscriber stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Upper bound of the wait before retry `attempt` (zero based).
    fn ceiling(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(attempt.min(31) as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connecting,
    Streaming,
    Waiting { attempt: u32, delay: Duration },
    GaveUp,
}

pub struct Backoff<R = StdRng> {
    policy: BackoffPolicy,
    state: State,
    failures: u32,
    rng: R,
}

impl Backoff<StdRng> {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }
}

impl<R: Rng> Backoff<R> {
    pub fn with_rng(policy: BackoffPolicy, rng: R) -> Self {
        Self {
            policy,
            state: State::Connecting,
            failures: 0,
            rng,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The server acknowledged the stream. Consecutive failures start over.
    pub fn connected(&mut self) {
        if self.state == State::Connecting {
            self.state = State::Streaming;
            self.failures = 0;
        }
    }

    /// The connection attempt failed or an open stream ended.
    pub fn failed(&mut self) -> State {
        match self.state {
            State::Connecting | State::Streaming => {
                self.failures += 1;
                self.state = if self.failures > self.policy.max_retries {
                    State::GaveUp
                } else {
                    let attempt = self.failures - 1;
                    State::Waiting {
                        attempt,
                        delay: self.jittered(attempt),
                    }
                };
            }
            State::Waiting { .. } | State::GaveUp => {}
        }
        self.state
    }

    /// The wait is over; try again.
    pub fn retry(&mut self) {
        if let State::Waiting { .. } = self.state {
            self.state = State::Connecting;
        }
    }

    fn jittered(&mut self, attempt: u32) -> Duration {
        let ceiling = self.policy.ceiling(attempt);
        let floor = ceiling / 2;
        if floor == ceiling {
            return ceiling;
        }
        self.rng.gen_range(floor..=ceiling)
    }
}
