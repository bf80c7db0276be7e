use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use condukt::exec::RuntimeEnvironment;
use futures::FutureExt;
use futures::future::BoxFuture;

/// A runtime with a manual clock.
///
/// - `now()` returns the current fake instant (2026-01-01T00:00:00Z at start).
/// - `random()` pops scripted values, then returns the fallback (0.0).
/// - `sleep()` records the requested delay, advances the clock by it and
///   returns immediately.
pub struct FakeRuntime {
    state: Mutex<State>,
}

struct State {
    now: DateTime<Utc>,
    randoms: VecDeque<f64>,
    fallback_random: f64,
    sleeps: Vec<Duration>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                now: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                randoms: VecDeque::new(),
                fallback_random: 0.0,
                sleeps: Vec::new(),
            }),
        }
    }

    pub fn with_randoms(self, values: impl IntoIterator<Item = f64>) -> Self {
        self.state.lock().unwrap().randoms.extend(values);
        self
    }

    pub fn with_fallback_random(self, value: f64) -> Self {
        self.state.lock().unwrap().fallback_random = value;
        self
    }

    /// Move the clock forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now += chrono::Duration::from_std(by).expect("duration in range");
    }

    /// Every delay passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeEnvironment for FakeRuntime {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().now
    }

    fn random(&self) -> f64 {
        let mut state = self.state.lock().unwrap();
        let fallback = state.fallback_random;
        state.randoms.pop_front().unwrap_or(fallback)
    }

    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()> {
        {
            let mut state = self.state.lock().unwrap();
            state.sleeps.push(delay);
            state.now += chrono::Duration::from_std(delay).expect("duration in range");
        }
        futures::future::ready(()).boxed()
    }
}
