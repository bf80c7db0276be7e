// src/contract/schema.rs

//! JSON Schema contracts (Draft 7).

use futures::FutureExt;
use futures::future::BoxFuture;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use super::{Contract, ContractCheck, PathSegment, RawIssue};
use crate::errors::{ConduktError, Result};

/// Contract backed by a compiled JSON Schema document.
///
/// The validated value is passed through unchanged.
pub struct JsonSchemaContract {
    compiled: JSONSchema,
}

impl std::fmt::Debug for JsonSchemaContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaContract").finish_non_exhaustive()
    }
}

impl JsonSchemaContract {
    /// Compile `schema`. Fails if the schema itself is invalid.
    pub fn new(schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| ConduktError::ContractError(format!("invalid JSON schema: {e}")))?;
        Ok(Self { compiled })
    }

    fn issues_for(&self, value: &Value) -> Vec<RawIssue> {
        // The error iterator borrows `value`; collect before returning.
        match self.compiled.validate(value) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| {
                    let mut path = PathSegment::from_pointer(&e.instance_path.to_string());
                    // `required` is reported on the parent object; point at the missing key.
                    if let ValidationErrorKind::Required { property } = &e.kind {
                        path.push(PathSegment::from_json(property));
                    }
                    RawIssue {
                        message: e.to_string(),
                        path,
                    }
                })
                .collect(),
        }
    }
}

impl Contract for JsonSchemaContract {
    fn check(&self, value: Value) -> BoxFuture<'_, ContractCheck> {
        let issues = self.issues_for(&value);
        let result = if issues.is_empty() {
            Ok(value)
        } else {
            Err(issues)
        };
        futures::future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractValidation, validate_contract};
    use serde_json::json;

    fn draft_schema() -> Value {
        json!({
            "type": "object",
            "required": ["article", "claims"],
            "properties": {
                "article": { "type": "string" },
                "claims": { "type": "array", "items": { "type": "string" } }
            }
        })
    }

    #[tokio::test]
    async fn accepts_conforming_value_unchanged() {
        let contract = JsonSchemaContract::new(&draft_schema()).unwrap();
        let value = json!({ "article": "hello", "claims": ["a"] });
        assert_eq!(
            validate_contract(&contract, value.clone()).await,
            ContractValidation::Valid(value)
        );
    }

    #[tokio::test]
    async fn reports_field_path_for_wrong_type() {
        let contract = JsonSchemaContract::new(&draft_schema()).unwrap();
        let value = json!({ "article": "hello", "claims": "not-a-list" });
        let ContractValidation::Invalid(issues) = validate_contract(&contract, value).await else {
            panic!("expected invalid");
        };
        assert_eq!(issues[0].path, "claims");
    }

    #[tokio::test]
    async fn reports_nested_index_path() {
        let contract = JsonSchemaContract::new(&draft_schema()).unwrap();
        let value = json!({ "article": "hello", "claims": ["ok", 3] });
        let ContractValidation::Invalid(issues) = validate_contract(&contract, value).await else {
            panic!("expected invalid");
        };
        assert_eq!(issues[0].path, "claims.1");
    }

    #[tokio::test]
    async fn missing_required_field_is_reported_by_name() {
        let contract = JsonSchemaContract::new(&draft_schema()).unwrap();
        let ContractValidation::Invalid(issues) =
            validate_contract(&contract, json!({ "article": "hello" })).await
        else {
            panic!("expected invalid");
        };
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "claims");
        assert!(issues[0].message.contains("required"));
    }

    #[tokio::test]
    async fn missing_nested_field_keeps_parent_path() {
        let schema = json!({
            "type": "object",
            "properties": {
                "meta": { "type": "object", "required": ["author"] }
            }
        });
        let contract = JsonSchemaContract::new(&schema).unwrap();
        let ContractValidation::Invalid(issues) =
            validate_contract(&contract, json!({ "meta": {} })).await
        else {
            panic!("expected invalid");
        };
        assert_eq!(issues[0].path, "meta.author");
    }

    #[test]
    fn invalid_schema_is_a_construction_error() {
        let err = JsonSchemaContract::new(&json!({ "type": 42 })).unwrap_err();
        assert!(matches!(err, ConduktError::ContractError(_)));
    }
}
