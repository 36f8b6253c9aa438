//! SQL text generation for the document store.
//!
//! Add and Get have a fixed shape per collection. Patch and List depend on the
//! caller's attribute and condition names, which are interpolated into the
//! statement text; those names must pass [`validate_identifier`] first. Values
//! are always bound as positional parameters, serialized to JSON text.

use crate::error::{Result, StoreError};
use crate::model::{Attributes, Condition, Operator, json_kind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

/// Longest collection or attribute name accepted.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// `modified_at` for a patch: the current time, or one millisecond past the
/// previous value when the clock has not moved beyond it. Keeps the RFC 3339
/// millisecond form of the timestamp columns.
pub const NEXT_MODIFIED_AT_SQL: &str = "CASE WHEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now') > modified_at \
     THEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
     ELSE strftime('%Y-%m-%dT%H:%M:%fZ', modified_at, '+0.001 seconds') END";

/// Envelope columns in the order every row mapper reads them.
pub const COLUMNS: &str = "id, content, created_by, created_at, modified_by, modified_at";

/// Patch binds the updater and the id first; attribute values start here.
const PATCH_FIRST_VALUE_INDEX: usize = 3;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
});

/// Check that `name` is safe to embed in statement text.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] for empty, over-long or
/// non-`[A-Za-z_][A-Za-z0-9_]*` names.
pub fn validate_identifier(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.len() > MAX_IDENTIFIER_LEN {
        "must be at most 64 characters"
    } else if !IDENTIFIER_RE.is_match(name) {
        "must start with a letter or underscore and contain only letters, digits and underscores"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidIdentifier {
        name: name.to_string(),
        reason,
    })
}

/// Statement text plus the JSON-encoded values for its trailing placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<String>,
}

/// `INSERT` for Add: binds `?1` id, `?2` content JSON, `?3` creator.
#[must_use]
pub fn insert(collection: &str) -> String {
    format!(
        "INSERT INTO {collection} (id, content, created_by, modified_by) \
         VALUES (?1, json(?2), ?3, ?3) RETURNING created_at, modified_at"
    )
}

/// `SELECT` for Get: binds `?1` id.
#[must_use]
pub fn select_one(collection: &str) -> String {
    format!("SELECT {COLUMNS} FROM {collection} WHERE id = ?1")
}

/// `UPDATE` for Patch: binds `?1` updater, `?2` id, then one value per attribute.
///
/// With no attributes only the audit columns are touched.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] for a bad attribute name or
/// [`StoreError::Serialization`] if a value cannot be encoded.
pub fn patch(collection: &str, attributes: &Attributes) -> Result<Statement> {
    let mut sql =
        format!("UPDATE {collection} SET modified_by = ?1, modified_at = {NEXT_MODIFIED_AT_SQL}");
    let mut values = Vec::with_capacity(attributes.len());

    if !attributes.is_empty() {
        sql.push_str(", content = json_set(content");
        for (index, (name, value)) in attributes.iter().enumerate() {
            validate_identifier(name)?;
            let encoded = serde_json::to_string(value)
                .map_err(|source| StoreError::serialization(format!("attribute '{name}'"), source))?;
            let _ = write!(
                sql,
                ", '$.{name}', json(?{})",
                PATCH_FIRST_VALUE_INDEX + index
            );
            values.push(encoded);
        }
        sql.push(')');
    }

    let _ = write!(sql, " WHERE id = ?2 RETURNING {COLUMNS}");
    Ok(Statement { sql, values })
}

/// `SELECT` for List: one `?N` per non-null condition, all ANDed. No ordering.
///
/// Values only compare against attributes of the same JSON type (integers
/// and reals are one type), so `true` never equals `1`. `<>` also matches
/// attributes of another type. A null value matches an explicit JSON null
/// with `=` and anything else present with `<>`. A missing attribute never
/// matches.
///
/// # Errors
///
/// Returns [`StoreError::InvalidIdentifier`] for a bad attribute name,
/// [`StoreError::InvalidCondition`] for a non-scalar value or an ordering
/// against null, or [`StoreError::Serialization`] if a value cannot be encoded.
pub fn list(collection: &str, conditions: &[Condition]) -> Result<Statement> {
    let mut sql = format!("SELECT {COLUMNS} FROM {collection}");
    let mut values = Vec::with_capacity(conditions.len());

    for (index, condition) in conditions.iter().enumerate() {
        validate_identifier(&condition.attribute)?;
        let attribute = &condition.attribute;
        sql.push_str(if index == 0 { " WHERE " } else { " AND " });

        let Some(types) = comparable_types(condition)? else {
            let op = match condition.op {
                Operator::Equal | Operator::NotEqual => condition.op.as_sql(),
                other => {
                    return Err(StoreError::InvalidCondition {
                        attribute: attribute.clone(),
                        reason: format!("null can only be compared with = or <>, not {other}"),
                    });
                }
            };
            let _ = write!(sql, "json_type(content, '$.{attribute}') {op} 'null'");
            continue;
        };

        let encoded = serde_json::to_string(&condition.value).map_err(|source| {
            StoreError::serialization(format!("condition on '{attribute}'"), source)
        })?;
        values.push(encoded);

        let kind = format!("json_type(content, '$.{attribute}')");
        let compare = format!(
            "json_extract(content, '$.{attribute}') {} json_extract(?{}, '$')",
            condition.op.as_sql(),
            values.len()
        );
        let _ = if condition.op == Operator::NotEqual {
            write!(sql, "({kind} NOT IN ({types}) OR {compare})")
        } else {
            write!(sql, "({kind} IN ({types}) AND {compare})")
        };
    }

    Ok(Statement { sql, values })
}

/// `json_type` names a condition value compares against; `None` for null.
fn comparable_types(condition: &Condition) -> Result<Option<&'static str>> {
    match &condition.value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Bool(_) => Ok(Some("'true', 'false'")),
        serde_json::Value::Number(_) => Ok(Some("'integer', 'real'")),
        serde_json::Value::String(_) => Ok(Some("'text'")),
        other => Err(StoreError::InvalidCondition {
            attribute: condition.attribute.clone(),
            reason: format!("value must be a scalar, got {}", json_kind(other)),
        }),
    }
}
