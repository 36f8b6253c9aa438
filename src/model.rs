//! Document envelope and listing conditions.
//!
//! Every collection stores the same envelope: an id, audit metadata, and a
//! typed `content` payload persisted as a JSON document. Only `content` varies
//! between collections.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A stored document: identity, audit fields and typed content.
///
/// `created_at <= modified_at` always holds; both are equal right after the
/// document is added. `created_by` never changes, `modified_by` tracks the
/// last patcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    /// Unique id within the collection (1 to 36 characters).
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub created_by: String,
    pub modified_by: String,
    pub content: T,
}

/// Partial replacement of top-level content attributes, keyed by name.
///
/// Ordered so the generated statement is identical for identical input.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Build [`Attributes`] from any value that serializes to a JSON object,
/// typically a struct holding just the fields to replace.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the value cannot be serialized or
/// is not a JSON object.
pub fn attributes_of<S: Serialize + ?Sized>(value: &S) -> Result<Attributes> {
    let json = serde_json::to_value(value)
        .map_err(|source| StoreError::serialization("patch attributes", source))?;
    match json {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(StoreError::serialization(
            "patch attributes",
            serde::de::Error::custom(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )),
        )),
    }
}

/// Comparison operator usable in a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<>")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<=")]
    LessThanOrEqual,
}

impl Operator {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Self::Equal),
            "<>" | "!=" => Ok(Self::NotEqual),
            ">" => Ok(Self::GreaterThan),
            "<" => Ok(Self::LessThan),
            ">=" => Ok(Self::GreaterThanOrEqual),
            "<=" => Ok(Self::LessThanOrEqual),
            other => Err(format!("unknown operator: {other}")),
        }
    }
}

/// A predicate on one top-level content attribute.
///
/// Conditions passed together to `List` are combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub op: Operator,
    pub value: serde_json::Value,
}

impl Condition {
    #[must_use]
    pub fn new(
        attribute: impl Into<String>,
        op: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(attribute: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(attribute, Operator::Equal, value)
    }
}

impl FromStr for Condition {
    type Err = String;

    /// Parse `attr<op>value`, e.g. `i>=10` or `name=widget`.
    ///
    /// The value is read as JSON when possible and as a plain string otherwise.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let start = s
            .find(['=', '<', '>', '!'])
            .ok_or_else(|| format!("missing operator in condition: {s}"))?;
        let rest = &s[start..];
        let op_len = rest
            .chars()
            .take_while(|c| matches!(c, '=' | '<' | '>' | '!'))
            .count();
        let attribute = s[..start].trim();
        if attribute.is_empty() {
            return Err(format!("missing attribute in condition: {s}"));
        }
        let op: Operator = rest[..op_len].parse()?;
        let raw = rest[op_len..].trim();
        Ok(Self::new(attribute, op, parse_loose_json(raw)))
    }
}

/// Read `raw` as JSON, falling back to a JSON string holding `raw` verbatim.
#[must_use]
pub fn parse_loose_json(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

pub(crate) const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Partial {
        i: i64,
        s: &'static str,
    }

    #[test]
    fn envelope_uses_camel_case_keys() {
        let now = Utc::now();
        let stored = Stored {
            id: "1".to_string(),
            created_at: now,
            modified_at: now,
            created_by: "alice".to_string(),
            modified_by: "alice".to_string(),
            content: json!({"i": 5}),
        };
        let value = serde_json::to_value(&stored).unwrap();
        for key in ["id", "createdAt", "modifiedAt", "createdBy", "modifiedBy", "content"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn attributes_from_struct() {
        let attrs = attributes_of(&Partial { i: 10, s: "x" }).unwrap();
        assert_eq!(attrs.get("i"), Some(&json!(10)));
        assert_eq!(attrs.get("s"), Some(&json!("x")));
    }

    #[test]
    fn attributes_reject_non_objects() {
        let err = attributes_of(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn operator_round_trips_through_sql_spelling() {
        let all = [
            Operator::Equal,
            Operator::NotEqual,
            Operator::GreaterThan,
            Operator::LessThan,
            Operator::GreaterThanOrEqual,
            Operator::LessThanOrEqual,
        ];
        for op in all {
            assert_eq!(op.as_sql().parse::<Operator>().unwrap(), op);
        }
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEqual);
        assert!("~".parse::<Operator>().is_err());
    }

    #[test]
    fn condition_parsing() {
        let cond: Condition = "i>=10".parse().unwrap();
        assert_eq!(cond, Condition::new("i", Operator::GreaterThanOrEqual, 10));

        let cond: Condition = "b = true".parse().unwrap();
        assert_eq!(cond, Condition::eq("b", true));

        let cond: Condition = "name=blue widget".parse().unwrap();
        assert_eq!(cond, Condition::eq("name", "blue widget"));

        let cond: Condition = "s<>\"a\"".parse().unwrap();
        assert_eq!(cond, Condition::new("s", Operator::NotEqual, "a"));

        assert!("=5".parse::<Condition>().is_err());
        assert!("novalue".parse::<Condition>().is_err());
    }
}
