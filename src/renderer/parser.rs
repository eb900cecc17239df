//! Tokenizer and block parser for section bodies.
//!
//! Grammar:
//! - `{{ path }}` and `{{ path | filter | filter(arg, ...) }}`
//! - `{{#if path}} ... {{#else}} ... {{/if}}`
//! - `{{#each path}} ... {{#else}} ... {{/each}}`
//!
//! `{{else}}` is accepted as an alias of `{{#else}}`.

use super::filters;
use crate::binder::PathExpr;
use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// One `{{ ... }}` tag, possibly spanning lines
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub path: PathExpr,
    pub filters: Vec<FilterCall>,
}

impl Expression {
    /// A leading `default(...)` makes a missing path acceptable.
    pub fn tolerates_missing(&self) -> bool {
        self.filters.first().is_some_and(|f| f.name == "default")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Expr(Expression),
    If { condition: PathExpr, then: Vec<Node>, otherwise: Vec<Node> },
    Each { path: PathExpr, body: Vec<Node>, otherwise: Vec<Node> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    Each,
}

impl BlockKind {
    fn name(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Each => "each",
        }
    }
}

#[derive(Debug)]
struct OpenBlock {
    kind: BlockKind,
    path: PathExpr,
    then: Vec<Node>,
    otherwise: Option<Vec<Node>>,
}

impl OpenBlock {
    fn into_node(self) -> Node {
        let otherwise = self.otherwise.unwrap_or_default();
        match self.kind {
            BlockKind::If => Node::If { condition: self.path, then: self.then, otherwise },
            BlockKind::Each => Node::Each { path: self.path, body: self.then, otherwise },
        }
    }
}

#[derive(Debug, Default)]
struct Parser {
    root: Vec<Node>,
    stack: Vec<OpenBlock>,
}

impl Parser {
    fn target(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(OpenBlock { otherwise: Some(nodes), .. }) => nodes,
            Some(OpenBlock { then, .. }) => then,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.target().push(Node::Text(text.to_string()));
        }
    }

    fn open(&mut self, kind: BlockKind, argument: &str, tag: &str) -> Result<()> {
        if argument.is_empty() {
            return Err(Error::InvalidExpressionError { expression: tag.to_string() });
        }
        let path = PathExpr::parse(argument)?;
        self.stack.push(OpenBlock { kind, path, then: Vec::new(), otherwise: None });
        Ok(())
    }

    fn otherwise(&mut self) -> Result<()> {
        match self.stack.last_mut() {
            None => Err(Error::UnbalancedBlockError {
                block: "else".into(),
                detail: "`{{#else}}` outside of an `if` or `each` block".into(),
            }),
            Some(block) if block.otherwise.is_some() => Err(Error::UnbalancedBlockError {
                block: block.kind.name().into(),
                detail: "more than one `{{#else}}` in the same block".into(),
            }),
            Some(block) => {
                block.otherwise = Some(Vec::new());
                Ok(())
            }
        }
    }

    fn close(&mut self, kind: BlockKind) -> Result<()> {
        let Some(block) = self.stack.pop() else {
            return Err(Error::UnbalancedBlockError {
                block: kind.name().into(),
                detail: format!("`{{{{/{}}}}}` without a matching opening tag", kind.name()),
            });
        };
        if block.kind != kind {
            return Err(Error::UnbalancedBlockError {
                block: block.kind.name().into(),
                detail: format!(
                    "expected `{{{{/{}}}}}`, found `{{{{/{}}}}}`",
                    block.kind.name(),
                    kind.name()
                ),
            });
        }
        let node = block.into_node();
        self.target().push(node);
        Ok(())
    }

    fn tag(&mut self, inner: &str, tag: &str) -> Result<()> {
        let invalid = || Error::InvalidExpressionError { expression: tag.to_string() };

        if inner.is_empty() {
            return Err(invalid());
        }
        if inner == "else" {
            return self.otherwise();
        }
        if let Some(directive) = inner.strip_prefix('#') {
            let (keyword, argument) = directive
                .split_once(char::is_whitespace)
                .map(|(k, a)| (k, a.trim()))
                .unwrap_or((directive, ""));
            return match keyword {
                "if" => self.open(BlockKind::If, argument, tag),
                "each" => self.open(BlockKind::Each, argument, tag),
                "else" if argument.is_empty() => self.otherwise(),
                _ => Err(invalid()),
            };
        }
        if let Some(closing) = inner.strip_prefix('/') {
            return match closing.trim() {
                "if" => self.close(BlockKind::If),
                "each" => self.close(BlockKind::Each),
                _ => Err(invalid()),
            };
        }

        let expression = parse_expression(inner)?;
        self.target().push(Node::Expr(expression));
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Node>> {
        if let Some(block) = self.stack.pop() {
            return Err(Error::UnbalancedBlockError {
                block: block.kind.name().into(),
                detail: format!("missing `{{{{/{}}}}}`", block.kind.name()),
            });
        }
        Ok(self.root)
    }
}

/// Splits on `separator` outside single or double quotes.
fn split_unquoted(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (position, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == separator => {
                parts.push(&input[start..position]);
                start = position + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_argument(raw: &str) -> Value {
    let raw = raw.trim();
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')));
    if quoted {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f).map(Value::Number)))
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

fn parse_filter(raw: &str, expression: &str) -> Result<FilterCall> {
    let invalid = || Error::InvalidExpressionError { expression: expression.to_string() };
    let raw = raw.trim();

    let (name, args) = match raw.split_once('(') {
        Some((name, rest)) => {
            let inner = rest.trim_end().strip_suffix(')').ok_or_else(invalid)?;
            let args = if inner.trim().is_empty() {
                Vec::new()
            } else {
                split_unquoted(inner, ',').into_iter().map(parse_argument).collect()
            };
            (name.trim(), args)
        }
        None => (raw, Vec::new()),
    };
    if name.is_empty() {
        return Err(invalid());
    }

    let (min, max) = filters::arity(name)
        .ok_or_else(|| Error::UnknownFilterError { name: name.to_string() })?;
    if args.len() < min || args.len() > max {
        return Err(invalid());
    }
    Ok(FilterCall { name: name.to_string(), args })
}

/// Parses the inside of a `{{ ... }}` substitution tag.
pub fn parse_expression(inner: &str) -> Result<Expression> {
    let mut parts = split_unquoted(inner, '|').into_iter();
    let path = PathExpr::parse(parts.next().unwrap_or_default())?;
    let filters = parts
        .map(|raw| parse_filter(raw, inner))
        .collect::<Result<Vec<_>>>()?;
    Ok(Expression { path, filters })
}

/// Parses a section body into nodes, rejecting unknown filters, unbalanced
/// blocks and unterminated or empty tags.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let mut parser = Parser::default();
    let mut last = 0;

    for found in TAG.captures_iter(source) {
        let (Some(whole), Some(inner)) = (found.get(0), found.get(1)) else {
            continue;
        };
        parser.push_text(&source[last..whole.start()]);
        parser.tag(inner.as_str().trim(), whole.as_str())?;
        last = whole.end();
    }

    let rest = &source[last..];
    if let Some(position) = rest.find("{{") {
        return Err(Error::InvalidExpressionError { expression: rest[position..].to_string() });
    }
    parser.push_text(rest);
    parser.finish()
}
