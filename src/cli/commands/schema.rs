//! Schema command implementation.
//!
//! Emits the JSON Schema of a stored item, for tooling that consumes the
//! `--json` output.

use crate::domain::Item;
use crate::error::{Result, StoreError};
use crate::format::{OutputContext, OutputMode};
use crate::model::Stored;
use schemars::schema::RootSchema;
use schemars::schema_for;

pub fn execute(ctx: &OutputContext) -> Result<()> {
    if matches!(ctx.mode(), OutputMode::Quiet) {
        return Ok(());
    }

    // Schema output is always JSON, with or without --json.
    let schema = build_schema();
    let json = serde_json::to_string_pretty(&schema)
        .map_err(|source| StoreError::serialization("item schema", source))?;
    println!("{json}");
    Ok(())
}

fn build_schema() -> RootSchema {
    schema_for!(Stored<Item>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_describes_envelope_and_content() {
        let value = serde_json::to_value(build_schema()).unwrap();
        let properties = value["properties"].as_object().unwrap();
        for field in ["id", "createdAt", "modifiedAt", "createdBy", "modifiedBy", "content"] {
            assert!(properties.contains_key(field), "missing {field}");
        }
        let required: Vec<&str> = value["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(serde_json::Value::as_str)
            .collect();
        assert!(required.contains(&"content"));
    }
}
