//! Template store
//!
//! Discovers definition files under a template root, parses them and indexes
//! templates by `(platform, documentType, techStack)` and fragments by name.
//! The store is immutable once built; reloading builds a new one.
//!
//! - `definition`: the in-memory model and the YAML file format
//! - `validate`: whole-tree validation reporting every problem at once

pub mod definition;
pub mod validate;

pub use definition::{
    find_key_line, find_section_line, parse_definition, DefinitionKind, Section,
    TemplateDefinition, TemplateKey, VariableSpec,
};
pub use validate::{validate_tree, Diagnostic};

use crate::config::EngineConfig;
use crate::constants::DEFAULT_IGNORE_PATTERNS;
use crate::error::{Error, Result};
use crate::ext::PathExt;
use crate::merge::{AnchorMerger, FragmentSource};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Builds a `GlobSet` from patterns matched against root-relative paths.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        debug!("Adding pattern: {} to globset", pattern.as_ref());
        builder.add(Glob::new(pattern.as_ref())?);
    }
    Ok(builder.build()?)
}

/// Which files under a root are template definitions.
#[derive(Debug, Clone)]
pub struct Discovery {
    include: GlobSet,
    ignore: GlobSet,
}

impl Discovery {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let ignore: Vec<&str> = DEFAULT_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(config.ignore.iter().map(String::as_str))
            .collect();
        Ok(Self {
            include: build_globset(&config.template_globs)?,
            ignore: build_globset(&ignore)?,
        })
    }

    pub fn is_match(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.ignore.is_match(relative)
    }

    /// Matching files under `root`, in file-name order.
    pub fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().relative_to(root);
            if self.is_match(relative) {
                files.push(entry.path().to_path_buf());
            } else {
                debug!("Skipping non-template file: {}", relative.display());
            }
        }
        Ok(files)
    }
}

/// Root-relative path and modification time of every definition file,
/// sorted by path. Any added, removed, renamed or re-stamped file changes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFingerprint {
    entries: Vec<(PathBuf, SystemTime)>,
}

impl StoreFingerprint {
    pub fn of(root: &Path, files: &[PathBuf]) -> Result<Self> {
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let modified = std::fs::metadata(file)?.modified()?;
            entries.push((file.relative_to(root).to_path_buf(), modified));
        }
        entries.sort();
        Ok(Self { entries })
    }

    pub fn files(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(PathBuf, SystemTime)] {
        &self.entries
    }
}

/// Indexed, immutable set of parsed definitions.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
    templates: BTreeMap<TemplateKey, TemplateDefinition>,
    fragments: BTreeMap<String, TemplateDefinition>,
    broken: BTreeMap<TemplateKey, String>,
    discovery: Option<Discovery>,
    fingerprint: StoreFingerprint,
}

impl TemplateStore {
    /// Loads every definition under `root`.
    ///
    /// Unreadable or malformed files and duplicate identities fail the whole
    /// load. Inheritance problems only mark the affected templates as broken.
    pub fn load<P: AsRef<Path>>(root: P, config: &EngineConfig) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::TemplateRootDoesNotExist {
                template_dir: root.display().to_string(),
            });
        }

        let discovery = Discovery::new(config)?;
        let files = discovery.discover_files(root)?;
        let fingerprint = StoreFingerprint::of(root, &files)?;

        let mut definitions = Vec::with_capacity(files.len());
        for file in &files {
            debug!("Parsing template file: {}", file.display());
            let text = std::fs::read_to_string(file)?;
            definitions.push(parse_definition(file, &text)?);
        }

        let mut store = Self::build(definitions)?;
        store.root = root.to_path_buf();
        store.discovery = Some(discovery);
        store.fingerprint = fingerprint;
        info!(
            "Loaded {} templates and {} fragments from {}",
            store.templates.len(),
            store.fragments.len(),
            root.display()
        );
        Ok(store)
    }

    /// Builds a store from definitions already in memory.
    pub fn from_definitions(definitions: Vec<TemplateDefinition>) -> Result<Self> {
        Self::build(definitions)
    }

    fn build(definitions: Vec<TemplateDefinition>) -> Result<Self> {
        let mut store = Self {
            root: PathBuf::new(),
            templates: BTreeMap::new(),
            fragments: BTreeMap::new(),
            broken: BTreeMap::new(),
            discovery: None,
            fingerprint: StoreFingerprint::default(),
        };

        for definition in definitions {
            match definition.kind.clone() {
                DefinitionKind::Template(key) => {
                    if let Some(first) = store.templates.get(&key) {
                        return Err(Error::DuplicateDefinitionError {
                            key: key.to_string(),
                            first: first.source.clone(),
                            second: definition.source,
                        });
                    }
                    store.templates.insert(key, definition);
                }
                DefinitionKind::Fragment(name) => {
                    if let Some(first) = store.fragments.get(&name) {
                        return Err(Error::DuplicateDefinitionError {
                            key: format!("fragment:{name}"),
                            first: first.source.clone(),
                            second: definition.source,
                        });
                    }
                    store.fragments.insert(name, definition);
                }
            }
        }

        store.check_inheritance();
        Ok(store)
    }

    fn check_inheritance(&mut self) {
        let merger = AnchorMerger::new(&*self);
        let mut broken = BTreeMap::new();

        for (name, fragment) in &self.fragments {
            if let Err(e) = merger.merge(fragment) {
                warn!("Fragment '{name}' cannot be inherited: {e}");
            }
        }
        for (key, template) in &self.templates {
            if let Err(e) = merger.merge(template) {
                error!("Template '{key}' is unusable: {e}");
                broken.insert(key.clone(), e.to_string());
            }
        }
        self.broken = broken;
    }

    pub fn get(&self, key: &TemplateKey) -> Option<&TemplateDefinition> {
        self.templates.get(key)
    }

    pub fn get_fragment(&self, name: &str) -> Option<&TemplateDefinition> {
        self.fragments.get(name)
    }

    pub fn templates(&self) -> impl Iterator<Item = &TemplateDefinition> {
        self.templates.values()
    }

    pub fn fragments(&self) -> impl Iterator<Item = &TemplateDefinition> {
        self.fragments.values()
    }

    /// Templates whose inheritance chain failed, with the reason.
    pub fn broken(&self) -> &BTreeMap<TemplateKey, String> {
        &self.broken
    }

    pub fn is_broken(&self, key: &TemplateKey) -> bool {
        self.broken.contains_key(key)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fingerprint(&self) -> &StoreFingerprint {
        &self.fingerprint
    }

    /// True when the files under the root no longer match what was loaded.
    /// Stores built in memory are never stale.
    pub fn is_stale(&self) -> Result<bool> {
        let Some(discovery) = &self.discovery else {
            return Ok(false);
        };
        let files = discovery.discover_files(&self.root)?;
        Ok(StoreFingerprint::of(&self.root, &files)? != self.fingerprint)
    }
}

impl FragmentSource for TemplateStore {
    fn fragment(&self, name: &str) -> Option<&TemplateDefinition> {
        self.get_fragment(name)
    }
}
