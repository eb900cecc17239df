//! The closed set of filters usable in `{{ path | filter(args) }}`.

use crate::binder::{stringify, type_name};
use crate::error::{Error, Result};
use cruet::{
    case::{
        camel::to_camel_case, kebab::to_kebab_case, pascal::to_pascal_case,
        screaming_snake::to_screaming_snake_case, snake::to_snake_case,
        train::to_train_case,
    },
    string::{pluralize::to_plural, singularize::to_singular},
};
use serde_json::Value;

const DEFAULT_JOIN_SEPARATOR: &str = ", ";

/// Accepted argument counts, or `None` for an unknown filter.
pub fn arity(name: &str) -> Option<(usize, usize)> {
    let arity = match name {
        "upper" | "lower" | "trim" | "capitalize" | "length" | "first" | "last" => (0, 0),
        "snake_case" | "kebab_case" | "camel_case" | "pascal_case"
        | "screaming_snake_case" | "train_case" | "plural" | "singular" => (0, 0),
        "join" => (0, 1),
        "default" => (1, 1),
        _ => return None,
    };
    Some(arity)
}

fn mismatch(path: &str, expected: &str, found: &Value) -> Error {
    Error::TypeMismatchError {
        path: path.to_string(),
        expected: expected.to_string(),
        found: type_name(found).to_string(),
    }
}

/// Scalars are filtered through their text form; lists and maps are not text.
fn as_text(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(mismatch(path, "string", value)),
        scalar => Ok(stringify(scalar)),
    }
}

fn text_filter(value: &Value, path: &str, f: impl Fn(&str) -> String) -> Result<Value> {
    Ok(Value::String(f(&as_text(value, path)?)))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Applies filter `name` to `value`. `path` names the reference in errors.
pub fn apply(name: &str, value: &Value, args: &[Value], path: &str) -> Result<Value> {
    match name {
        "upper" => text_filter(value, path, str::to_uppercase),
        "lower" => text_filter(value, path, str::to_lowercase),
        "trim" => text_filter(value, path, |s| s.trim().to_string()),
        "capitalize" => text_filter(value, path, capitalize),
        "snake_case" => text_filter(value, path, to_snake_case),
        "kebab_case" => text_filter(value, path, to_kebab_case),
        "camel_case" => text_filter(value, path, to_camel_case),
        "pascal_case" => text_filter(value, path, to_pascal_case),
        "screaming_snake_case" => text_filter(value, path, to_screaming_snake_case),
        "train_case" => text_filter(value, path, to_train_case),
        "plural" => text_filter(value, path, to_plural),
        "singular" => text_filter(value, path, to_singular),
        "length" => match value {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::Object(map) => Ok(Value::from(map.len())),
            other => Err(mismatch(path, "string, list or map", other)),
        },
        "first" | "last" => {
            let pick_last = name == "last";
            match value {
                Value::Array(items) => {
                    let item = if pick_last { items.last() } else { items.first() };
                    Ok(item.cloned().unwrap_or(Value::Null))
                }
                Value::String(s) => {
                    let c = if pick_last { s.chars().last() } else { s.chars().next() };
                    Ok(c.map(|c| Value::String(c.to_string())).unwrap_or(Value::Null))
                }
                other => Err(mismatch(path, "list or string", other)),
            }
        }
        "join" => {
            let separator = match args.first() {
                Some(arg) => stringify(arg),
                None => DEFAULT_JOIN_SEPARATOR.to_string(),
            };
            match value {
                Value::Array(items) => Ok(Value::String(
                    items.iter().map(stringify).collect::<Vec<_>>().join(&separator),
                )),
                other => Err(mismatch(path, "list", other)),
            }
        }
        "default" => match value {
            Value::Null => Ok(args.first().cloned().unwrap_or(Value::Null)),
            Value::String(s) if s.is_empty() => Ok(args.first().cloned().unwrap_or(Value::Null)),
            other => Ok(other.clone()),
        },
        unknown => Err(Error::UnknownFilterError { name: unknown.to_string() }),
    }
}
