//! Layered configuration loading
//!
//! A config value is assembled from three layers: the struct's own
//! defaults, an optional YAML file, and prefixed environment
//! variables. Later layers win, so an operator can always override a
//! deployed file from the environment.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("configuration does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Assemble a configuration from defaults, an optional YAML file and
/// `PREFIX__SECTION__FIELD` environment variables.
///
/// Double underscores separate path segments, so field names keep
/// their single ones: `ONCALL__REDIS__URL` patches `redis.url`,
/// `ONCALL__DISPATCHER__LEASE_TTL_SECONDS` patches
/// `dispatcher.lease_ttl_seconds`. A missing file is not an error.
pub fn load_layered<T>(env_prefix: &str, yaml_path: Option<&Path>) -> Result<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    let mut tree = serde_json::to_value(T::default())?;

    if let Some(path) = yaml_path {
        if path.exists() {
            tree = overlay(tree, read_yaml(path)?);
            tracing::info!("Loaded config file {}", path.display());
        } else {
            debug!("No config file at {}, skipping that layer", path.display());
        }
    }

    for (segments, value) in env_overrides(env_prefix) {
        graft(&mut tree, &segments, value);
    }

    Ok(serde_json::from_value(tree)?)
}

fn read_yaml(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::ParseFile {
        path: path.display().to_string(),
        source,
    })
}

/// Merge `patch` onto `base`: objects merge key-wise, anything else is
/// replaced by the patch value.
fn overlay(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => overlay(base_value, patch_value),
                    None => patch_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, patch) => patch,
    }
}

/// Collect `PREFIX__…` environment variables as (path, value) pairs.
fn env_overrides(prefix: &str) -> Vec<(Vec<String>, Value)> {
    let marker = format!("{}__", prefix);

    std::env::vars()
        .filter_map(|(key, raw)| {
            let rest = key.strip_prefix(&marker)?;
            let segments: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
            if segments.iter().any(String::is_empty) {
                return None;
            }
            debug!("Config override from {}", key);
            Some((segments, coerce(&raw)))
        })
        .collect()
}

/// Write `value` at `path`, growing intermediate objects as needed.
/// Scalars in the way are displaced; the environment is authoritative.
fn graft(tree: &mut Value, path: &[String], value: Value) {
    let Some((leaf, branches)) = path.split_last() else {
        return;
    };

    let mut node = tree;
    for segment in branches {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(leaf.clone(), value);
    }
}

/// Environment values are strings; booleans, numbers and null are
/// taken at face value, everything else stays a string.
fn coerce(raw: &str) -> Value {
    match serde_json::from_str(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}
