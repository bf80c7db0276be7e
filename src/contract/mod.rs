// src/contract/mod.rs

//! Output contracts.
//!
//! A contract is anything that can look at an arbitrary JSON value and
//! either hand back a (possibly transformed) value or a list of issues.
//! Validation may be asynchronous.
//!
//! - [`issue`] holds the issue types and path normalization.
//! - [`schema`] adapts JSON Schema documents.
//! - [`typed`] adapts serde types, closures, and the accept-anything contract.

pub mod issue;
pub mod schema;
pub mod typed;

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::warn;

pub use issue::{ContractIssue, PathSegment, RawIssue, ROOT_PATH, format_path};
pub use schema::JsonSchemaContract;
pub use typed::{AnyContract, FnContract, TypedContract};

/// Outcome of a single contract check, before normalization.
pub type ContractCheck = std::result::Result<Value, Vec<RawIssue>>;

/// Message used when a contract rejects a value without saying why.
pub const DEFAULT_CONTRACT_FAILURE: &str = "contract validation failed";

/// Capability to validate (and optionally transform) a task's output.
pub trait Contract: Send + Sync {
    fn check(&self, value: Value) -> BoxFuture<'_, ContractCheck>;
}

impl<C: Contract + ?Sized> Contract for std::sync::Arc<C> {
    fn check(&self, value: Value) -> BoxFuture<'_, ContractCheck> {
        (**self).check(value)
    }
}

/// Normalized result of [`validate_contract`].
#[derive(Debug, Clone, PartialEq)]
pub enum ContractValidation {
    Valid(Value),
    Invalid(Vec<ContractIssue>),
}

impl ContractValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, ContractValidation::Valid(_))
    }
}

/// Validate `value` against `contract`.
///
/// Never panics: a contract that panics, or rejects without issues, is
/// reported as a single `<root>` issue.
pub async fn validate_contract(contract: &dyn Contract, value: Value) -> ContractValidation {
    let checked = AssertUnwindSafe(async move { contract.check(value).await })
        .catch_unwind()
        .await;

    match checked {
        Ok(Ok(value)) => ContractValidation::Valid(value),
        Ok(Err(issues)) if issues.is_empty() => {
            ContractValidation::Invalid(vec![ContractIssue::root(DEFAULT_CONTRACT_FAILURE)])
        }
        Ok(Err(issues)) => {
            ContractValidation::Invalid(issues.into_iter().map(ContractIssue::from).collect())
        }
        Err(panic) => {
            let message = crate::exec::panic_message(panic.as_ref());
            warn!(%message, "contract check panicked");
            ContractValidation::Invalid(vec![ContractIssue::root(format!(
                "contract check panicked: {message}"
            ))])
        }
    }
}
