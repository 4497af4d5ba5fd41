//! JSON, TOML and YAML modules
//!
//! A structured document is a module whose attributes are the keys of its
//! top-level mapping. Values are converted to JSON following the same rules
//! as the DEPS encoder: scalar keys are stringified, non-finite floats and
//! composite keys are rejected.

use crate::{Error, Result};
use serde_json::{Map, Number, Value};
use std::path::Path;

fn parse_error(path: &Path, format: &str, message: impl Into<String>) -> Error {
    Error::ModuleParse {
        path: path.to_path_buf(),
        format: format.to_string(),
        message: message.into(),
    }
}

pub(crate) fn parse_json(source: &str, path: &Path) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(source).map_err(|e| parse_error(path, "json", e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(parse_error(path, "json", "top-level value must be an object")),
    }
}

pub(crate) fn parse_toml(source: &str, path: &Path) -> Result<toml::Table> {
    toml::from_str(source).map_err(|e| parse_error(path, "toml", e.to_string()))
}

pub(crate) fn parse_yaml(source: &str, path: &Path) -> Result<serde_yaml::Mapping> {
    if source.trim().is_empty() {
        return Ok(serde_yaml::Mapping::new());
    }
    let value: serde_yaml::Value =
        serde_yaml::from_str(source).map_err(|e| parse_error(path, "yaml", e.to_string()))?;
    match value {
        serde_yaml::Value::Mapping(mapping) => Ok(mapping),
        // An empty document is an empty module
        serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
        _ => Err(parse_error(path, "yaml", "top-level value must be a mapping")),
    }
}

fn float(f: f64) -> std::result::Result<Value, String> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| format!("out of range float value {f}"))
}

pub(crate) fn toml_to_json(value: &toml::Value) -> std::result::Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => float(*f)?,
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(toml_to_json)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        toml::Value::Table(table) => {
            let mut map = Map::new();
            for (key, value) in table {
                map.insert(key.clone(), toml_to_json(value)?);
            }
            Value::Object(map)
        }
    })
}

pub(crate) fn yaml_to_json(value: &serde_yaml::Value) -> std::result::Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                float(n.as_f64().unwrap_or(f64::NAN))?
            }
        }
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(
            items
                .iter()
                .map(yaml_to_json)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value)?,
    })
}

fn yaml_key(key: &serde_yaml::Value) -> std::result::Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(&tagged.value),
        Yaml::Sequence(_) => Err("keys must be scalars, not a sequence".to_string()),
        Yaml::Mapping(_) => Err("keys must be scalars, not a mapping".to_string()),
    }
}
