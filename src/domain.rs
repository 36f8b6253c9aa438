//! Content types stored by the `stored` binary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Collection provisioned by migration 1.
pub const ITEM_COLLECTION: &str = "item";
/// Collection provisioned by migration 2.
pub const APP_COLLECTION: &str = "app";

/// A named thing with a free-text description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A client application authorized by API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct App {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(default)]
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_uses_camel_case_key() {
        let app = App {
            api_key: "k-1".to_string(),
            disabled: false,
        };
        assert_eq!(
            serde_json::to_value(&app).unwrap(),
            json!({"apiKey": "k-1", "disabled": false})
        );
    }

    #[test]
    fn item_description_defaults_to_empty() {
        let item: Item = serde_json::from_value(json!({"name": "n"})).unwrap();
        assert_eq!(item.description, "");
    }

    #[test]
    fn item_rejects_wrong_name_type() {
        assert!(serde_json::from_value::<Item>(json!({"name": 3})).is_err());
    }
}
