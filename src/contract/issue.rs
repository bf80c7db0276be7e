// src/contract/issue.rs

//! Contract issues and path normalization.
//!
//! Validators describe where a value went wrong in different shapes:
//! plain keys, array indices, JSON pointers, or `{ "key": ... }` wrapper
//! objects. Traces only ever carry the normalized dotted form, with
//! `<root>` standing in for "no field path".

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path used when an issue does not point at a specific field.
pub const ROOT_PATH: &str = "<root>";

/// A normalized contract validation issue, as recorded in traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractIssue {
    pub path: String,
    pub message: String,
}

impl ContractIssue {
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: ROOT_PATH.to_string(),
            message: message.into(),
        }
    }
}

impl From<RawIssue> for ContractIssue {
    fn from(raw: RawIssue) -> Self {
        Self {
            path: format_path(&raw.path),
            message: raw.message,
        }
    }
}

/// One segment of an issue path as reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Interpret a JSON value as a path segment.
    ///
    /// Accepts strings, non-negative integers, and `{ "key": <segment> }`
    /// wrapper objects. Anything else is rendered through its JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => PathSegment::Key(s.clone()),
            Value::Number(n) => match n.as_u64() {
                Some(i) => PathSegment::Index(i as usize),
                None => PathSegment::Key(n.to_string()),
            },
            Value::Object(map) => match map.get("key") {
                Some(inner) => PathSegment::from_json(inner),
                None => PathSegment::Key(value.to_string()),
            },
            other => PathSegment::Key(other.to_string()),
        }
    }

    /// Split a JSON pointer (`/claims/0`) into segments.
    pub fn from_pointer(pointer: &str) -> Vec<PathSegment> {
        pointer
            .split('/')
            .skip(1)
            .map(|token| {
                let token = token.replace("~1", "/").replace("~0", "~");
                match token.parse::<usize>() {
                    Ok(i) => PathSegment::Index(i),
                    Err(_) => PathSegment::Key(token),
                }
            })
            .collect()
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// An issue as produced by a contract, before path normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIssue {
    pub message: String,
    pub path: Vec<PathSegment>,
}

impl RawIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn at<I, S>(path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self {
            message: message.into(),
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

/// Collapse path segments into a dotted string; an empty path is `<root>`.
pub fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return ROOT_PATH.to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_path_is_root() {
        assert_eq!(format_path(&[]), "<root>");
    }

    #[test]
    fn mixed_segments_join_with_dots() {
        let path = vec![
            PathSegment::from_json(&json!("claims")),
            PathSegment::from_json(&json!({ "key": 2 })),
            PathSegment::from_json(&json!({ "key": "text" })),
        ];
        assert_eq!(format_path(&path), "claims.2.text");
    }

    #[test]
    fn pointer_tokens_are_unescaped() {
        let path = PathSegment::from_pointer("/a~1b/0/c~0d");
        assert_eq!(
            path,
            vec![
                PathSegment::Key("a/b".into()),
                PathSegment::Index(0),
                PathSegment::Key("c~d".into()),
            ]
        );
        assert!(PathSegment::from_pointer("").is_empty());
    }

    #[test]
    fn raw_issue_normalizes_into_contract_issue() {
        let issue: ContractIssue = RawIssue::at(["sources"], "expected array").into();
        assert_eq!(issue.path, "sources");
        assert_eq!(issue.message, "expected array");

        let root: ContractIssue = RawIssue::new("bad").into();
        assert_eq!(root.path, ROOT_PATH);
    }
}
