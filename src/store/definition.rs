//! Template definitions and their on-disk YAML form.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Lookup key of a resolvable template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    pub platform: String,
    pub document_type: String,
    pub tech_stack: String,
}

impl TemplateKey {
    pub fn new(
        platform: impl Into<String>,
        document_type: impl Into<String>,
        tech_stack: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            document_type: document_type.into(),
            tech_stack: tech_stack.into(),
        }
    }
}

impl Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.platform, self.document_type, self.tech_stack)
    }
}

/// A named block of template text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub name: String,
    pub body: String,
}

impl Section {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self { name: name.into(), body: body.into() }
    }
}

/// Schema entry for one variable.
///
/// `required` stays `None` when a file does not mention it, so an overlay
/// only replaces the attributes it actually sets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VariableSpec {
    pub fn required() -> Self {
        Self { required: Some(true), ..Default::default() }
    }

    pub fn optional() -> Self {
        Self { required: Some(false), ..Default::default() }
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

/// Whether a definition is directly resolvable or only inheritable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionKind {
    Template(TemplateKey),
    Fragment(String),
}

/// One parsed template file. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefinition {
    pub kind: DefinitionKind,
    pub version: String,
    pub description: Option<String>,
    pub sections: Vec<Section>,
    pub variables: IndexMap<String, VariableSpec>,
    pub base_refs: Vec<String>,
    pub source: PathBuf,
}

impl TemplateDefinition {
    pub fn template(key: TemplateKey, version: impl Into<String>) -> Self {
        Self {
            kind: DefinitionKind::Template(key),
            version: version.into(),
            description: None,
            sections: Vec::new(),
            variables: IndexMap::new(),
            base_refs: Vec::new(),
            source: PathBuf::new(),
        }
    }

    pub fn fragment(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: DefinitionKind::Fragment(name.into()),
            ..Self::template(TemplateKey::new("", "", ""), version)
        }
    }

    pub fn with_section(mut self, name: &str, body: &str) -> Self {
        self.sections.push(Section::new(name, body));
        self
    }

    pub fn with_variable(mut self, name: &str, spec: VariableSpec) -> Self {
        self.variables.insert(name.to_string(), spec);
        self
    }

    pub fn with_base(mut self, name: &str) -> Self {
        self.base_refs.push(name.to_string());
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    /// `platform/documentType/techStack@version`, or `fragment:name@version`.
    pub fn id(&self) -> String {
        match &self.kind {
            DefinitionKind::Template(key) => format!("{key}@{}", self.version),
            DefinitionKind::Fragment(name) => format!("fragment:{name}@{}", self.version),
        }
    }

    pub fn key(&self) -> Option<&TemplateKey> {
        match &self.kind {
            DefinitionKind::Template(key) => Some(key),
            DefinitionKind::Fragment(_) => None,
        }
    }

    pub fn fragment_name(&self) -> Option<&str> {
        match &self.kind {
            DefinitionKind::Fragment(name) => Some(name.as_str()),
            DefinitionKind::Template(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TemplateFile {
    platform: String,
    document_type: String,
    tech_stack: String,
    #[serde(deserialize_with = "deserialize_version")]
    version: String,
    #[serde(default)]
    description: Option<String>,
    sections: Vec<Section>,
    variables: IndexMap<String, VariableSpec>,
    #[serde(default)]
    base_refs: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FragmentFile {
    fragment: String,
    #[serde(deserialize_with = "deserialize_version")]
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    variables: IndexMap<String, VariableSpec>,
    #[serde(default)]
    base_refs: Vec<String>,
}

fn deserialize_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "version must be a string or a number, found {other:?}"
        ))),
    }
}

/// One-based line of the first top-level `key:` in `text`, or 1.
pub fn find_key_line(text: &str, key: &str) -> usize {
    let prefix = format!("{key}:");
    text.lines()
        .position(|line| line.starts_with(&prefix))
        .map(|index| index + 1)
        .unwrap_or(1)
}

/// One-based line declaring section `name`, or the `sections:` line.
pub fn find_section_line(text: &str, name: &str) -> usize {
    text.lines()
        .position(|line| {
            let line = line.trim_start().trim_start_matches("- ").trim();
            line.strip_prefix("name:").is_some_and(|value| {
                value.trim().trim_matches(|c| c == '"' || c == '\'') == name
            })
        })
        .map(|index| index + 1)
        .unwrap_or_else(|| find_key_line(text, "sections"))
}

fn yaml_error(file: &Path, err: &serde_yaml::Error) -> Error {
    Error::ParseError {
        file: file.to_path_buf(),
        line: err.location().map(|location| location.line()).unwrap_or(1),
        message: err.to_string(),
    }
}

fn ensure_identifier(file: &Path, text: &str, key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() || value.contains('/') {
        return Err(Error::ParseError {
            file: file.to_path_buf(),
            line: find_key_line(text, key),
            message: format!("`{key}` must be a non-empty name without '/', found {value:?}"),
        });
    }
    Ok(())
}

fn ensure_sections(file: &Path, text: &str, sections: &[Section]) -> Result<()> {
    if let Some(section) = sections.iter().find(|s| s.name.trim().is_empty()) {
        return Err(Error::ParseError {
            file: file.to_path_buf(),
            line: find_section_line(text, &section.name),
            message: "section names must not be empty".into(),
        });
    }
    Ok(())
}

/// Parses one template or fragment file.
///
/// Files with a top-level `fragment` key are fragments; everything else must
/// carry the full `platform`/`documentType`/`techStack` identity.
pub fn parse_definition(file: &Path, text: &str) -> Result<TemplateDefinition> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| yaml_error(file, &e))?;
    let Some(mapping) = document.as_mapping() else {
        return Err(Error::ParseError {
            file: file.to_path_buf(),
            line: 1,
            message: "a template file must be a YAML mapping".into(),
        });
    };

    let definition = if mapping.contains_key("fragment") {
        let raw: FragmentFile = serde_yaml::from_str(text).map_err(|e| yaml_error(file, &e))?;
        ensure_identifier(file, text, "fragment", &raw.fragment)?;
        ensure_sections(file, text, &raw.sections)?;
        TemplateDefinition {
            kind: DefinitionKind::Fragment(raw.fragment),
            version: raw.version,
            description: raw.description,
            sections: raw.sections,
            variables: raw.variables,
            base_refs: raw.base_refs,
            source: file.to_path_buf(),
        }
    } else {
        let raw: TemplateFile = serde_yaml::from_str(text).map_err(|e| yaml_error(file, &e))?;
        ensure_identifier(file, text, "platform", &raw.platform)?;
        ensure_identifier(file, text, "documentType", &raw.document_type)?;
        ensure_identifier(file, text, "techStack", &raw.tech_stack)?;
        ensure_sections(file, text, &raw.sections)?;
        TemplateDefinition {
            kind: DefinitionKind::Template(TemplateKey::new(
                raw.platform,
                raw.document_type,
                raw.tech_stack,
            )),
            version: raw.version,
            description: raw.description,
            sections: raw.sections,
            variables: raw.variables,
            base_refs: raw.base_refs,
            source: file.to_path_buf(),
        }
    };
    Ok(definition)
}
