//! Inheritance between templates and their base fragments.
//!
//! Bases are applied in `baseRefs` order, each one overlaid by the next, and
//! the definition's own fields are applied last. Sections are keyed by name:
//! a later section replaces an earlier one in place, new names are appended.
//! Variable specs merge per key and per attribute.

use crate::error::{Error, Result};
use crate::store::{Section, TemplateDefinition, TemplateKey, VariableSpec};
use indexmap::IndexMap;
use log::trace;
use std::collections::HashSet;
use std::path::PathBuf;

/// Anything that can hand out fragments by name.
pub trait FragmentSource {
    fn fragment(&self, name: &str) -> Option<&TemplateDefinition>;
}

/// A definition with every base fragment materialized into it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTemplate {
    pub id: String,
    pub key: Option<TemplateKey>,
    pub version: String,
    pub description: Option<String>,
    pub sections: Vec<Section>,
    pub variables: IndexMap<String, VariableSpec>,
    /// Fragments applied, in application order.
    pub lineage: Vec<String>,
    pub source: PathBuf,
}

impl MergedTemplate {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }
}

#[derive(Debug, Default)]
struct Layer {
    description: Option<String>,
    sections: Vec<Section>,
    variables: IndexMap<String, VariableSpec>,
    lineage: Vec<String>,
}

impl Layer {
    fn overlay_sections(&mut self, sections: &[Section]) {
        for section in sections {
            match self.sections.iter_mut().find(|existing| existing.name == section.name) {
                Some(existing) => existing.body = section.body.clone(),
                None => self.sections.push(section.clone()),
            }
        }
    }

    fn overlay_variables(&mut self, variables: &IndexMap<String, VariableSpec>) {
        for (name, spec) in variables {
            match self.variables.get_mut(name) {
                Some(existing) => {
                    if spec.required.is_some() {
                        existing.required = spec.required;
                    }
                    if spec.default.is_some() {
                        existing.default = spec.default.clone();
                    }
                    if spec.description.is_some() {
                        existing.description = spec.description.clone();
                    }
                }
                None => {
                    self.variables.insert(name.clone(), spec.clone());
                }
            }
        }
    }

    fn overlay(&mut self, other: Layer) {
        if other.description.is_some() {
            self.description = other.description;
        }
        self.overlay_sections(&other.sections);
        self.overlay_variables(&other.variables);
        for name in other.lineage {
            if !self.lineage.contains(&name) {
                self.lineage.push(name);
            }
        }
    }
}

/// Flattens `baseRefs` chains into [`MergedTemplate`]s.
pub struct AnchorMerger<'a, S: FragmentSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: FragmentSource + ?Sized> AnchorMerger<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Merges `definition` with all of its transitive bases.
    ///
    /// Every fragment may be visited once per call. A name reached a second
    /// time, through its own chain or through another parent, fails with
    /// `CyclicInheritanceError`. An unknown base name fails with
    /// `FragmentNotFoundError`. Nothing is produced on failure.
    pub fn merge(&self, definition: &TemplateDefinition) -> Result<MergedTemplate> {
        let root_name = definition
            .fragment_name()
            .map(str::to_string)
            .unwrap_or_else(|| definition.id());
        let mut visited = HashSet::from([root_name.clone()]);
        let mut chain = vec![root_name];
        let layer = self.materialize(definition, &mut chain, &mut visited)?;

        Ok(MergedTemplate {
            id: definition.id(),
            key: definition.key().cloned(),
            version: definition.version.clone(),
            description: layer.description,
            sections: layer.sections,
            variables: layer.variables,
            lineage: layer.lineage,
            source: definition.source.clone(),
        })
    }

    fn materialize(
        &self,
        definition: &TemplateDefinition,
        chain: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) -> Result<Layer> {
        let mut layer = Layer::default();

        for base in &definition.base_refs {
            if !visited.insert(base.clone()) {
                let mut cycle = chain.clone();
                cycle.push(base.clone());
                return Err(Error::CyclicInheritanceError { chain: cycle.join(" -> ") });
            }
            let fragment = self.source.fragment(base).ok_or_else(|| {
                Error::FragmentNotFoundError {
                    name: base.clone(),
                    referenced_by: definition.id(),
                }
            })?;
            trace!("Merging fragment '{base}' into '{}'", definition.id());

            chain.push(base.clone());
            let mut inherited = self.materialize(fragment, chain, visited)?;
            chain.pop();

            inherited.lineage.push(base.clone());
            layer.overlay(inherited);
        }

        layer.overlay(Layer {
            description: definition.description.clone(),
            sections: definition.sections.clone(),
            variables: definition.variables.clone(),
            lineage: Vec::new(),
        });
        Ok(layer)
    }
}
