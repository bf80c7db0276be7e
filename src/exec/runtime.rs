// src/exec/runtime.rs

//! Runtime environment injected into the engine.
//!
//! Production code uses [`SystemRuntime`]; tests supply an implementation
//! with a manual clock so durations and backoff delays can be asserted
//! exactly.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::trace::TaskTiming;

pub trait RuntimeEnvironment: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Uniform sample in `[0, 1)`.
    fn random(&self) -> f64;

    /// Suspend the calling task for `delay`.
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()>;

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    fn now_iso(&self) -> String {
        format_timestamp(self.now())
    }
}

/// Wall clock, thread-local RNG and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRuntime;

impl RuntimeEnvironment for SystemRuntime {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn random(&self) -> f64 {
        rand::random::<f64>()
    }

    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()> {
        tokio::time::sleep(delay).boxed()
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Captures a start instant and turns it into a [`TaskTiming`].
#[derive(Debug, Clone)]
pub struct Stopwatch {
    started_at: String,
    started_ms: i64,
}

impl Stopwatch {
    pub fn start(runtime: &dyn RuntimeEnvironment) -> Self {
        let now = runtime.now();
        Self {
            started_at: format_timestamp(now),
            started_ms: now.timestamp_millis(),
        }
    }

    pub fn finish(&self, runtime: &dyn RuntimeEnvironment) -> TaskTiming {
        let now = runtime.now();
        TaskTiming {
            started_at: self.started_at.clone(),
            finished_at: format_timestamp(now),
            duration_ms: now.timestamp_millis().saturating_sub(self.started_ms).max(0) as u64,
        }
    }

    /// A zero-length timing at the current instant.
    pub fn instant(runtime: &dyn RuntimeEnvironment) -> TaskTiming {
        let now = runtime.now_iso();
        TaskTiming {
            started_at: now.clone(),
            finished_at: now,
            duration_ms: 0,
        }
    }
}
