// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`runtime`] is the injectable environment (clock, randomness, sleep)
//!   so that timing and retry delays are deterministic under test.
//! - [`context`] is the read-only view a running task gets of the run.
//! - [`retry`] runs one task body with bounded retries, backoff and
//!   contract validation, producing that task's trace.

pub mod context;
pub mod retry;
pub mod runtime;

pub use context::TaskContext;
pub use retry::{RetryPolicy, run_with_retry};
pub use runtime::{RuntimeEnvironment, Stopwatch, SystemRuntime, format_timestamp};

use std::any::Any;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
