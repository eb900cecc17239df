//! Interpreter for parsed section bodies.

use super::filters;
use super::interface::{RenderedDocument, TemplateRenderer};
use super::parser::{parse, Expression, Node};
use crate::binder::{is_truthy, stringify, type_name, walk, Bindings, PathExpr, PathScope};
use crate::constants::DEFAULT_SECTION_SEPARATOR;
use crate::error::{Error, Result};
use crate::merge::MergedTemplate;
use crate::request::RenderedSection;
use log::debug;
use serde_json::Value;
use std::borrow::Cow;

/// Current element of an enclosing `{{#each}}`.
#[derive(Debug)]
struct Frame<'a> {
    item: &'a Value,
    index: usize,
    len: usize,
}

struct Evaluation<'b, 'a> {
    bindings: &'b Bindings<'a>,
    frames: Vec<Frame<'a>>,
    warnings: &'b mut Vec<String>,
}

impl<'b, 'a> Evaluation<'b, 'a> {
    fn warn(&mut self, warning: String) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Loop-local names first, innermost loop outwards, then the root context.
    fn resolve(&self, path: &PathExpr) -> Option<Cow<'a, Value>> {
        let frame = self.frames.last();
        match path.scope {
            PathScope::Index => frame.map(|f| Cow::Owned(Value::from(f.index))),
            PathScope::First => frame.map(|f| Cow::Owned(Value::Bool(f.index == 0))),
            PathScope::Last => frame.map(|f| Cow::Owned(Value::Bool(f.index + 1 == f.len))),
            PathScope::This => {
                let item = frame?.item;
                walk(item, &path.segments).map(Cow::Borrowed)
            }
            PathScope::Root => {
                if let Some(key) = path.root_key() {
                    for frame in self.frames.iter().rev() {
                        let owns_key = frame
                            .item
                            .as_object()
                            .is_some_and(|map| map.contains_key(key));
                        if owns_key {
                            return walk(frame.item, &path.segments).map(Cow::Borrowed);
                        }
                    }
                }
                self.bindings.lookup(path).map(Cow::Borrowed)
            }
        }
    }

    fn expression(&mut self, expression: &Expression, out: &mut String) -> Result<()> {
        let path = &expression.path;
        let mut value = match self.resolve(path) {
            Some(value) => value.into_owned(),
            None if expression.tolerates_missing() => Value::Null,
            None => {
                if let Some(warning) = self.bindings.on_missing(path)? {
                    self.warn(warning);
                }
                return Ok(());
            }
        };

        let label = path.to_string();
        for filter in &expression.filters {
            value = filters::apply(&filter.name, &value, &filter.args, &label)?;
        }
        out.push_str(&stringify(&value));
        Ok(())
    }

    fn each(
        &mut self,
        path: &PathExpr,
        body: &[Node],
        otherwise: &[Node],
        out: &mut String,
    ) -> Result<()> {
        let items: &'a [Value] = match self.resolve(path) {
            Some(Cow::Borrowed(Value::Array(items))) => items,
            Some(Cow::Borrowed(Value::Null)) => &[],
            Some(other) => {
                return Err(Error::TypeMismatchError {
                    path: path.to_string(),
                    expected: "list".into(),
                    found: type_name(&other).into(),
                })
            }
            None => {
                if let Some(warning) = self.bindings.on_missing(path)? {
                    self.warn(warning);
                }
                &[]
            }
        };

        if items.is_empty() {
            return self.nodes(otherwise, out);
        }
        for (index, item) in items.iter().enumerate() {
            self.frames.push(Frame { item, index, len: items.len() });
            let result = self.nodes(body, out);
            self.frames.pop();
            result?;
        }
        Ok(())
    }

    fn nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr(expression) => self.expression(expression, out)?,
                Node::If { condition, then, otherwise } => {
                    let truthy = self.resolve(condition).is_some_and(|v| is_truthy(&v));
                    self.nodes(if truthy { then } else { otherwise }, out)?;
                }
                Node::Each { path, body, otherwise } => self.each(path, body, otherwise, out)?,
            }
        }
        Ok(())
    }
}

/// Renders `{{ }}` section bodies and joins sections into one document.
#[derive(Debug, Clone)]
pub struct BlockRenderer {
    section_separator: String,
}

impl BlockRenderer {
    pub fn new(section_separator: impl Into<String>) -> Self {
        Self { section_separator: section_separator.into() }
    }

    /// Renders a single body. Warnings are appended to `warnings`, without
    /// duplicates.
    pub fn render_body(
        &self,
        body: &str,
        bindings: &Bindings<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        let nodes = parse(body)?;
        let mut out = String::new();
        Evaluation { bindings, frames: Vec::new(), warnings }.nodes(&nodes, &mut out)?;
        Ok(out)
    }
}

impl Default for BlockRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_SEPARATOR)
    }
}

impl TemplateRenderer for BlockRenderer {
    fn render(
        &self,
        template: &MergedTemplate,
        bindings: &Bindings<'_>,
    ) -> Result<RenderedDocument> {
        let parsed = template
            .sections
            .iter()
            .map(|section| parse(&section.body).map(|nodes| (section.name.as_str(), nodes)))
            .collect::<Result<Vec<_>>>()?;

        let mut warnings = bindings.check_required()?;
        let mut sections = Vec::with_capacity(parsed.len());
        for (name, nodes) in &parsed {
            let mut text = String::new();
            Evaluation { bindings, frames: Vec::new(), warnings: &mut warnings }
                .nodes(nodes, &mut text)?;
            if text.trim().is_empty() {
                debug!("Skipping empty section '{name}' of '{}'", template.id);
                continue;
            }
            sections.push(RenderedSection { name: name.to_string(), text });
        }

        let text = sections
            .iter()
            .map(|section| section.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.section_separator);
        Ok(RenderedDocument { text, sections, warnings })
    }

    fn check(&self, body: &str) -> Result<()> {
        parse(body).map(|_| ())
    }
}
