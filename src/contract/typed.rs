// src/contract/typed.rs

use std::fmt;
use std::marker::PhantomData;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Segment;

use super::{Contract, ContractCheck, PathSegment, RawIssue};

/// Contract that round-trips the value through a serde type `T`.
///
/// Unknown fields are dropped and defaults filled in according to `T`'s
/// serde attributes, so the published output is the normalized form.
pub struct TypedContract<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedContract<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedContract<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypedContract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedContract")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Contract for TypedContract<T>
where
    T: DeserializeOwned + Serialize + 'static,
{
    fn check(&self, value: Value) -> BoxFuture<'_, ContractCheck> {
        let result = serde_path_to_error::deserialize(value)
            .map_err(|e| vec![deserialize_issue(&e)])
            .and_then(|typed: T| {
                serde_json::to_value(&typed).map_err(|e| vec![RawIssue::new(e.to_string())])
            });
        futures::future::ready(result).boxed()
    }
}

/// Turn a path-tracking serde error into an issue at the offending field.
///
/// serde reports a missing field against the enclosing struct, so the field
/// name is taken from the message and appended to the path.
fn deserialize_issue(err: &serde_path_to_error::Error<serde_json::Error>) -> RawIssue {
    let mut path: Vec<PathSegment> = err
        .path()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(PathSegment::Index(*index)),
            Segment::Map { key } => Some(PathSegment::Key(key.clone())),
            Segment::Enum { variant } => Some(PathSegment::Key(variant.clone())),
            Segment::Unknown => None,
        })
        .collect();

    let message = err.inner().to_string();
    if let Some(field) = missing_field(&message) {
        path.push(PathSegment::Key(field.to_string()));
    }
    RawIssue { message, path }
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(field, _)| field)
}

/// Contract defined by a synchronous closure.
pub struct FnContract<F> {
    check: F,
}

impl<F> FnContract<F>
where
    F: Fn(&Value) -> ContractCheck + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

impl<F> Contract for FnContract<F>
where
    F: Fn(&Value) -> ContractCheck + Send + Sync,
{
    fn check(&self, value: Value) -> BoxFuture<'_, ContractCheck> {
        futures::future::ready((self.check)(&value)).boxed()
    }
}

/// Accepts every value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyContract;

impl Contract for AnyContract {
    fn check(&self, value: Value) -> BoxFuture<'_, ContractCheck> {
        futures::future::ready(Ok(value)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractIssue, ContractValidation, ROOT_PATH, validate_contract};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Research {
        topics: Vec<String>,
        #[serde(default)]
        sources: Vec<String>,
    }

    #[tokio::test]
    async fn typed_contract_normalizes_output() {
        let contract = TypedContract::<Research>::new();
        let result = validate_contract(&contract, json!({ "topics": ["a"], "extra": 1 })).await;
        assert_eq!(
            result,
            ContractValidation::Valid(json!({ "topics": ["a"], "sources": [] }))
        );
    }

    async fn issues_for(value: Value) -> Vec<ContractIssue> {
        let contract = TypedContract::<Research>::new();
        match validate_contract(&contract, value).await {
            ContractValidation::Invalid(issues) => issues,
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn typed_contract_reports_field_with_wrong_type() {
        let issues = issues_for(json!({ "topics": "nope", "sources": [] })).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "topics");
        assert!(issues[0].message.contains("invalid type"));
    }

    #[tokio::test]
    async fn typed_contract_reports_missing_field_by_name() {
        let issues = issues_for(json!({ "sources": [] })).await;
        assert_eq!(issues[0].path, "topics");
        assert_eq!(issues[0].message, "missing field `topics`");
    }

    #[tokio::test]
    async fn typed_contract_reports_index_inside_list() {
        let issues = issues_for(json!({ "topics": ["a", 7] })).await;
        assert_eq!(issues[0].path, "topics.1");
    }

    #[tokio::test]
    async fn typed_contract_rejects_non_object_at_root() {
        let issues = issues_for(json!(42)).await;
        assert_eq!(issues[0].path, ROOT_PATH);
    }

    #[tokio::test]
    async fn fn_contract_can_transform() {
        let contract = FnContract::new(|v: &Value| match v.as_i64() {
            Some(n) => Ok(json!(n * 2)),
            None => Err(vec![RawIssue::new("expected integer")]),
        });
        assert_eq!(
            validate_contract(&contract, json!(21)).await,
            ContractValidation::Valid(json!(42))
        );
        assert!(!validate_contract(&contract, json!("x")).await.is_valid());
    }
}
