//! Render contexts: the caller-supplied data tree templates are evaluated against.

use crate::error::{Error, Result};
use crate::ext::PathExt;
use crate::ioutils::read_input;
use log::debug;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;

/// A JSON object of template inputs. Read-only during rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    value: Value,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { value: Value::Object(Map::new()) }
    }
}

impl RenderContext {
    /// Wraps `value`, which must be a map. `null` is treated as an empty map.
    pub fn new(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => Ok(Self { value }),
            Value::Null => Ok(Self::default()),
            other => Err(Error::InvalidContext(format!(
                "the context must be a map, found {}",
                crate::binder::type_name(&other)
            ))),
        }
    }

    /// Parses `text` as YAML or JSON. JSON is a subset of YAML, so YAML
    /// parsing accepts both.
    pub fn parse(text: &str, yaml: bool) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = if yaml {
            serde_yaml::from_str(text)?
        } else {
            serde_json::from_str(text)?
        };
        Self::new(value)
    }

    /// Loads a context file, picking the format by extension. `-` reads
    /// stdin, accepting JSON or YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading render context from {}", path.display());
        let text = read_input(path)?;
        let yaml = path == Path::new("-") || path.has_extension_in(&["yaml", "yml"]);
        Self::parse(&text, yaml)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Content hash that ignores map key order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        feed_canonical(&self.value, &mut hasher);
        hex::encode(hasher.finalize())
    }
}

impl TryFrom<Value> for RenderContext {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::new(value)
    }
}

fn feed_canonical(value: &Value, hasher: &mut Sha256) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            hasher.update(b"{");
            for key in keys {
                hasher.update(Value::String(key.clone()).to_string().as_bytes());
                hasher.update(b":");
                feed_canonical(&map[key], hasher);
                hasher.update(b",");
            }
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for item in items {
                feed_canonical(item, hasher);
                hasher.update(b",");
            }
            hasher.update(b"]");
        }
        scalar => hasher.update(scalar.to_string().as_bytes()),
    }
}
