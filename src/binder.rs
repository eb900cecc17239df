//! Variable binding
//!
//! A render context is flattened once per request into an index keyed by
//! canonical path (`a.b`, `items[0].label`), with schema defaults filling in
//! whatever the context leaves out. Templates then look paths up by key.

use crate::error::{Error, Result};
use crate::request::Strictness;
use crate::store::VariableSpec;
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Where a path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope {
    /// Looked up through the enclosing loops, then the root context.
    Root,
    /// `this`, the current loop element.
    This,
    /// `@index`
    Index,
    /// `@first`
    First,
    /// `@last`
    Last,
}

/// A parsed variable reference such as `component.name` or `this.items[2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub scope: PathScope,
    pub segments: Vec<Segment>,
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn invalid(raw: &str) -> Error {
    Error::InvalidExpressionError { expression: raw.to_string() }
}

impl PathExpr {
    /// Parses dotted paths with optional `[n]` indexes. All-digit segments
    /// are indexes, so `items.0` and `items[0]` are the same path. Against a
    /// map an index selects the key spelled with those digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let scope = match raw {
            "@index" => PathScope::Index,
            "@first" => PathScope::First,
            "@last" => PathScope::Last,
            _ => PathScope::Root,
        };
        if scope != PathScope::Root {
            return Ok(Self { scope, segments: Vec::new() });
        }
        if raw.is_empty() {
            return Err(invalid(raw));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if name.is_empty() {
                if segments.is_empty() || rest.is_empty() {
                    return Err(invalid(raw));
                }
            } else if name.chars().all(|c| c.is_ascii_digit()) {
                segments.push(Segment::Index(name.parse().map_err(|_| invalid(raw))?));
            } else if is_identifier(name) {
                segments.push(Segment::Key(name.to_string()));
            } else {
                return Err(invalid(raw));
            }

            while !rest.is_empty() {
                let Some(end) = rest.find(']') else {
                    return Err(invalid(raw));
                };
                let index = rest
                    .get(1..end)
                    .filter(|digits| rest.starts_with('[') && !digits.is_empty())
                    .and_then(|digits| digits.parse().ok())
                    .ok_or_else(|| invalid(raw))?;
                segments.push(Segment::Index(index));
                rest = &rest[end + 1..];
            }
        }

        if segments.first() == Some(&Segment::Key("this".into())) {
            segments.remove(0);
            return Ok(Self { scope: PathScope::This, segments });
        }
        Ok(Self { scope: PathScope::Root, segments })
    }

    /// Index key of the segments: keys joined by `.`, indexes as `[n]`.
    pub fn canonical(&self) -> String {
        canonical_of(&self.segments)
    }

    pub fn root_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }
}

fn canonical_of(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

impl Display for PathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            PathScope::Root => write!(f, "{}", self.canonical()),
            PathScope::This if self.segments.is_empty() => write!(f, "this"),
            PathScope::This => write!(f, "this.{}", self.canonical()),
            PathScope::Index => write!(f, "@index"),
            PathScope::First => write!(f, "@first"),
            PathScope::Last => write!(f, "@last"),
        }
    }
}

/// Follows `segments` down from `value`.
pub fn walk<'v>(value: &'v Value, segments: &[Segment]) -> Option<&'v Value> {
    segments.iter().try_fold(value, |current, segment| match segment {
        Segment::Key(key) => current.as_object()?.get(key),
        Segment::Index(index) => match current {
            Value::Array(items) => items.get(*index),
            Value::Object(map) => map.get(&index.to_string()),
            _ => None,
        },
    })
}

/// JSON type name used in type mismatch messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// `false`, `null`, `""` and `[]` are falsy. Numbers and maps are truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) | Value::Object(_) => true,
    }
}

/// Text form of a value as it appears in rendered output.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Canonical path of `key` under `prefix`. Digit keys use the `[n]` form
/// that [`PathExpr::canonical`] produces for them.
fn key_path(prefix: &str, key: &str) -> String {
    let digits = !key.is_empty() && key.chars().all(|c| c.is_ascii_digit());
    match key.parse::<usize>() {
        Ok(position) if digits => format!("{prefix}[{position}]"),
        _ if prefix.is_empty() => key.to_string(),
        _ => format!("{prefix}.{key}"),
    }
}

fn flatten<'a>(prefix: String, value: &'a Value, index: &mut HashMap<String, &'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(key_path(&prefix, key), child, index);
            }
        }
        Value::Array(items) => {
            for (position, child) in items.iter().enumerate() {
                flatten(format!("{prefix}[{position}]"), child, index);
            }
        }
        _ => {}
    }
    if !prefix.is_empty() {
        index.entry(prefix).or_insert(value);
    }
}

/// A context bound to a variable schema under one strictness policy.
#[derive(Debug)]
pub struct Bindings<'a> {
    index: HashMap<String, &'a Value>,
    declared: Vec<(String, bool)>,
    strictness: Strictness,
}

/// Flattens `context` and applies the defaults declared in `variables`.
pub fn bind<'a>(
    context: &'a Value,
    variables: &'a IndexMap<String, VariableSpec>,
    strictness: Strictness,
) -> Bindings<'a> {
    let mut index = HashMap::new();
    flatten(String::new(), context, &mut index);

    let mut declared = Vec::with_capacity(variables.len());
    for (name, spec) in variables {
        let canonical = PathExpr::parse(name)
            .map(|path| path.canonical())
            .unwrap_or_else(|_| name.clone());
        if let Some(default) = &spec.default {
            if !index.contains_key(&canonical) {
                flatten(canonical.clone(), default, &mut index);
            }
        }
        declared.push((canonical, spec.is_required()));
    }

    Bindings { index, declared, strictness }
}

impl<'a> Bindings<'a> {
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Root-context value at `path`, including schema defaults.
    pub fn lookup(&self, path: &PathExpr) -> Option<&'a Value> {
        self.index.get(&path.canonical()).copied()
    }

    /// Value stored under a canonical key.
    pub fn get(&self, canonical: &str) -> Option<&'a Value> {
        self.index.get(canonical).copied()
    }

    /// True when the path, or its root variable, is declared `required: false`.
    pub fn is_optional(&self, path: &PathExpr) -> bool {
        let canonical = path.canonical();
        self.declared.iter().any(|(name, required)| {
            !required && (*name == canonical || Some(name.as_str()) == path.root_key())
        })
    }

    /// Applies the missing-path policy to `path`.
    ///
    /// Returns the warning to record in lenient mode, `None` when the path is
    /// declared optional, and `UnresolvedVariableError` in strict mode.
    pub fn on_missing(&self, path: &PathExpr) -> Result<Option<String>> {
        if self.is_optional(path) {
            return Ok(None);
        }
        match self.strictness {
            Strictness::Strict => Err(Error::UnresolvedVariableError { path: path.to_string() }),
            Strictness::Lenient => {
                debug!("Unresolved variable '{path}' rendered as empty");
                Ok(Some(format!("Unresolved variable '{path}' rendered as empty")))
            }
        }
    }

    /// Checks every `required: true` variable, in schema order.
    ///
    /// Strict mode fails on the first missing one; lenient mode returns one
    /// warning per missing variable.
    pub fn check_required(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();
        for (name, required) in &self.declared {
            if !required || self.index.contains_key(name) {
                continue;
            }
            match self.strictness {
                Strictness::Strict => {
                    return Err(Error::UnresolvedVariableError { path: name.clone() })
                }
                Strictness::Lenient => {
                    debug!("Required variable '{name}' is missing from the context");
                    warnings.push(format!("Required variable '{name}' is missing"));
                }
            }
        }
        Ok(warnings)
    }
}
