//! Whole-tree validation that reports every problem instead of the first.

use super::definition::{find_key_line, find_section_line, parse_definition, DefinitionKind};
use super::{Discovery, TemplateDefinition};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::merge::{AnchorMerger, FragmentSource};
use crate::renderer::{BlockRenderer, TemplateRenderer};
use log::debug;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// One problem found in a template file. `line` is one-based.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    fn new(file: &Path, line: usize, message: impl Into<String>) -> Self {
        Self { file: file.to_path_buf(), line, message: message.into() }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.message)
    }
}

struct Parsed {
    definition: TemplateDefinition,
    identity_line: usize,
    base_refs_line: usize,
}

#[derive(Default)]
struct Fragments(BTreeMap<String, TemplateDefinition>);

impl FragmentSource for Fragments {
    fn fragment(&self, name: &str) -> Option<&TemplateDefinition> {
        self.0.get(name)
    }
}

fn check_file(
    file: &Path,
    renderer: &dyn TemplateRenderer,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Parsed> {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            diagnostics.push(Diagnostic::new(file, 1, format!("cannot read file: {e}")));
            return None;
        }
    };

    let definition = match parse_definition(file, &text) {
        Ok(definition) => definition,
        Err(Error::ParseError { file, line, message }) => {
            diagnostics.push(Diagnostic { file, line, message });
            return None;
        }
        Err(e) => {
            diagnostics.push(Diagnostic::new(file, 1, e.to_string()));
            return None;
        }
    };

    for section in &definition.sections {
        if let Err(e) = renderer.check(&section.body) {
            diagnostics.push(Diagnostic::new(
                file,
                find_section_line(&text, &section.name),
                format!("section '{}': {e}", section.name),
            ));
        }
    }

    let identity_key = match definition.kind {
        DefinitionKind::Template(_) => "platform",
        DefinitionKind::Fragment(_) => "fragment",
    };
    Some(Parsed {
        identity_line: find_key_line(&text, identity_key),
        base_refs_line: find_key_line(&text, "baseRefs"),
        definition,
    })
}

/// Validates one file or every template file under a directory.
///
/// Covers YAML syntax, missing and unknown keys, section bodies, duplicate
/// identities, unknown fragments and inheritance cycles.
pub fn validate_tree<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Vec<Diagnostic>> {
    let path = path.as_ref();
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        Discovery::new(config)?.discover_files(path)?
    } else {
        return Err(Error::TemplateRootDoesNotExist { template_dir: path.display().to_string() });
    };

    let renderer = BlockRenderer::new(config.section_separator.clone());
    let mut diagnostics = Vec::new();
    let mut parsed = Vec::with_capacity(files.len());
    for file in &files {
        debug!("Validating {}", file.display());
        if let Some(entry) = check_file(file, &renderer, &mut diagnostics) {
            parsed.push(entry);
        }
    }

    let mut templates: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut fragments = Fragments::default();
    for entry in &parsed {
        let definition = &entry.definition;
        let (identity, first) = match &definition.kind {
            DefinitionKind::Template(key) => {
                let identity = key.to_string();
                let first = templates.get(&identity).cloned();
                if first.is_none() {
                    templates.insert(identity.clone(), definition.source.clone());
                }
                (identity, first)
            }
            DefinitionKind::Fragment(name) => {
                let first = fragments.0.get(name).map(|f| f.source.clone());
                if first.is_none() {
                    fragments.0.insert(name.clone(), definition.clone());
                }
                (format!("fragment:{name}"), first)
            }
        };
        if let Some(first) = first {
            let error = Error::DuplicateDefinitionError {
                key: identity,
                first,
                second: definition.source.clone(),
            };
            diagnostics.push(Diagnostic::new(&definition.source, entry.identity_line, error.to_string()));
        }
    }

    let merger = AnchorMerger::new(&fragments);
    for entry in &parsed {
        if let Err(e) = merger.merge(&entry.definition) {
            diagnostics.push(Diagnostic::new(&entry.definition.source, entry.base_refs_line, e.to_string()));
        }
    }

    diagnostics.sort();
    diagnostics.dedup();
    Ok(diagnostics)
}
