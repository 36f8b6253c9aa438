//! Plain-text rendering of documents and reports.

use crate::health::Health;
use crate::model::Stored;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Write;

/// RFC 3339 with millisecond precision, matching what the database stores.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Full view of one document: envelope fields, then content attributes.
#[must_use]
pub fn format_document<T: Serialize>(doc: &Stored<T>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id:          {}", doc.id);
    let _ = writeln!(
        out,
        "created:     {} by {}",
        format_timestamp(&doc.created_at),
        doc.created_by
    );
    let _ = write!(
        out,
        "modified:    {} by {}",
        format_timestamp(&doc.modified_at),
        doc.modified_by
    );

    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(&doc.content) {
        for (key, value) in map {
            let rendered = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            let _ = write!(out, "\n{:<12} {rendered}", format!("{key}:"));
        }
    }
    out
}

/// One-line summary: id, the given label, last modifier.
#[must_use]
pub fn format_document_line<T>(doc: &Stored<T>, label: &str) -> String {
    format!("{}  {}  ({})", doc.id, label, doc.modified_by)
}

#[must_use]
pub fn format_health(health: &Health) -> String {
    let mut out = format!(
        "status:      {}\nservice:     {}\nschema:      {}",
        if health.is_ok() { "ok" } else { "error" },
        health.service_version,
        health.db_version
    );
    if !health.status_text.is_empty() {
        let _ = write!(out, "\ndetail:      {}", health.status_text);
    }
    out
}
