//! Configuration management for `stored`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`STORED_` prefix)
//! 3. `application.yaml` (explicit `--config`, or the first one found in
//!    `./`, `../`, `../../`, `../../../`)
//! 4. Defaults

use crate::error::{Result, StoreError};
use crate::storage::{SqliteDb, schema};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the configuration file searched for on startup.
pub const CONFIG_FILENAME: &str = "application.yaml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "STORED_";

const DEFAULT_DB_PATH: &str = "stored.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
const SEARCH_DEPTH: usize = 3;

/// A flat map of dotted keys (`db.path`) to raw string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file. Nested mappings become dotted keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        let mut layer = Self::default();
        flatten_yaml(&value, "", &mut layer.values);
        Ok(layer)
    }

    /// Build a layer from `STORED_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                for variant in env_key_variants(stripped) {
                    layer.values.insert(variant, value.clone());
                }
            }
        }
        layer
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }
}

/// Overrides taken from global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub actor: Option<String>,
    pub json: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(path) = &self.db {
            layer.set("db.path", path.to_string_lossy());
        }
        if let Some(actor) = &self.actor {
            layer.set("actor", actor.clone());
        }
        if let Some(json) = self.json {
            layer.set("json", json.to_string());
        }
        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("db.path", DEFAULT_DB_PATH);
    layer.set("db.busy_timeout_ms", DEFAULT_BUSY_TIMEOUT_MS.to_string());
    layer.set("db.auto_migrate", "true");
    layer.set("log.json", "false");
    layer
}

/// Find `application.yaml` in `start` or up to three of its ancestors.
#[must_use]
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(SEARCH_DEPTH + 1)
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

/// Load and merge every configuration layer.
///
/// # Errors
///
/// Returns an error if an explicit `--config` file is missing, or a config
/// file cannot be read or parsed.
pub fn load_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let file_layer = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                return Err(StoreError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            ConfigLayer::from_yaml(path)?
        }
        None => match find_config_file(&env::current_dir()?) {
            Some(path) => {
                debug!(path = %path.display(), "Using config file");
                ConfigLayer::from_yaml(&path)?
            }
            None => ConfigLayer::default(),
        },
    };

    Ok(ConfigLayer::merge_layers(&[
        default_config_layer(),
        file_layer,
        ConfigLayer::from_env(),
        cli.as_layer(),
    ]))
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub auto_migrate: bool,
    pub actor: Option<String>,
    pub json: bool,
    pub log_level: Option<String>,
    pub log_json: bool,
}

impl AppConfig {
    /// Convert a merged layer into typed settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for malformed numbers or booleans.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let db_path = layer
            .get("db.path")
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .unwrap_or(DEFAULT_DB_PATH);

        let busy_timeout_ms = match layer.get("db.busy_timeout_ms") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                StoreError::Config(format!("db.busy_timeout_ms must be an integer, got '{raw}'"))
            })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            auto_migrate: bool_value(layer, "db.auto_migrate", true)?,
            actor: non_empty(layer.get("actor")),
            json: bool_value(layer, "json", false)?,
            log_level: non_empty(layer.get("log.level")),
            log_json: bool_value(layer, "log.json", false)?,
        })
    }

    /// The actor recorded on writes: configured actor, then `$USER`, then
    /// `anonymous`.
    #[must_use]
    pub fn resolve_actor(&self) -> String {
        self.actor
            .clone()
            .or_else(|| non_empty(env::var("USER").ok().as_deref()))
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Open the configured database, applying pending migrations when
/// `db.auto_migrate` is on.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn open_database(config: &AppConfig) -> Result<Arc<SqliteDb>> {
    let db = SqliteDb::open(&config.db_path, config.busy_timeout)?;
    if config.auto_migrate {
        let version = db.with_connection(schema::upgrade)?;
        info!(version, path = %config.db_path.display(), "Database ready");
    }
    Ok(Arc::new(db))
}

fn bool_value(layer: &ConfigLayer, key: &str, default: bool) -> Result<bool> {
    match layer.get(key) {
        Some(raw) => parse_bool(raw)
            .ok_or_else(|| StoreError::Config(format!("{key} must be a boolean, got '{raw}'"))),
        None => Ok(default),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// `DB_BUSY_TIMEOUT_MS` → `db_busy_timeout_ms`, `db.busy.timeout.ms`,
/// `db.busy_timeout_ms`.
fn env_key_variants(raw: &str) -> Vec<String> {
    let lower = raw.to_lowercase();
    let mut variants = vec![lower.clone(), lower.replace('_', ".")];
    if let Some((section, rest)) = lower.split_once('_') {
        variants.push(format!("{section}.{rest}"));
    }
    variants.dedup();
    variants
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => flatten_yaml(&tagged.value, prefix, out),
        serde_yaml::Value::Bool(v) => {
            out.insert(prefix.to_string(), v.to_string());
        }
        serde_yaml::Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_yaml::Value::Null | serde_yaml::Value::Sequence(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layer(pairs: &[(&str, &str)]) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        for (key, value) in pairs {
            layer.set(key, *value);
        }
        layer
    }

    #[test]
    fn defaults_produce_usable_config() {
        let config = AppConfig::from_layer(&default_config_layer()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("stored.db"));
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.auto_migrate);
        assert!(!config.json);
        assert_eq!(config.actor, None);
    }

    #[test]
    fn merge_precedence_order() {
        let merged = ConfigLayer::merge_layers(&[
            default_config_layer(),
            layer(&[("db.path", "yaml.db")]),
            layer(&[("db.path", "env.db")]),
            CliOverrides {
                db: Some(PathBuf::from("cli.db")),
                ..CliOverrides::default()
            }
            .as_layer(),
        ]);
        assert_eq!(merged.get("db.path"), Some("cli.db"));
        assert_eq!(merged.get("db.busy_timeout_ms"), Some("5000"));
    }

    #[test]
    fn yaml_is_flattened_to_dotted_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "db:\n  path: /tmp/x.db\n  busy_timeout_ms: 250\nlog:\n  level: warn\n",
        )
        .unwrap();

        let layer = ConfigLayer::from_yaml(&path).unwrap();
        assert_eq!(layer.get("db.path"), Some("/tmp/x.db"));
        assert_eq!(layer.get("db.busy_timeout_ms"), Some("250"));

        let config = AppConfig::from_layer(&layer).unwrap();
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn env_vars_map_to_dotted_keys() {
        let layer = ConfigLayer::from_vars([
            ("STORED_DB_PATH".to_string(), "env.db".to_string()),
            ("STORED_DB_BUSY_TIMEOUT_MS".to_string(), "10".to_string()),
            ("OTHER_DB_PATH".to_string(), "ignored.db".to_string()),
        ]);
        let config = AppConfig::from_layer(&layer).unwrap();
        assert_eq!(config.db_path, PathBuf::from("env.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(10));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = AppConfig::from_layer(&layer(&[("db.busy_timeout_ms", "soon")])).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
        let err = AppConfig::from_layer(&layer(&[("db.auto_migrate", "maybe")])).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn config_file_found_in_ancestor() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "json: true\n").unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_config_file(&nested),
            Some(temp.path().join(CONFIG_FILENAME))
        );
    }

    #[test]
    fn config_file_search_is_bounded() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "json: true\n").unwrap();
        let deep = temp.path().join("a").join("b").join("c").join("d");
        fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_config_file(&deep), None);
    }

    #[test]
    fn explicit_actor_wins() {
        let config = AppConfig::from_layer(&layer(&[("actor", "alice")])).unwrap();
        assert_eq!(config.resolve_actor(), "alice");
    }

    #[test]
    fn open_database_applies_migrations() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::from_layer(&layer(&[(
            "db.path",
            temp.path().join("t.db").to_str().unwrap(),
        )]))
        .unwrap();
        let db = open_database(&config).unwrap();
        assert_eq!(
            schema::current_version(db.as_ref()).unwrap(),
            schema::latest_version()
        );
    }
}
