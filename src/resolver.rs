//! Fallback resolution
//!
//! Walks a fixed chain of increasingly general lookups and merges the first
//! hit with its base fragments:
//!
//! 1. `(platform, documentType, techStack)`
//! 2. `(platform, documentType, "custom")`
//! 3. `("any", documentType, techStack)`
//! 4. the built-in default, which always exists
//!
//! Every attempted step is reported as `<step>-hit` or `<step>-miss`.

use crate::constants::{builtin, fallback, AGNOSTIC_PLATFORM, AGNOSTIC_TECH_STACK};
use crate::error::GenerationError;
use crate::merge::{AnchorMerger, MergedTemplate};
use crate::request::ResolutionRequest;
use crate::store::{Section, TemplateKey, TemplateStore, VariableSpec};
use indexmap::IndexMap;
use log::debug;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStep {
    Exact,
    PlatformDocType,
    TechStackDocType,
    Builtin,
}

impl FallbackStep {
    pub const CHAIN: [FallbackStep; 4] = [
        FallbackStep::Exact,
        FallbackStep::PlatformDocType,
        FallbackStep::TechStackDocType,
        FallbackStep::Builtin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FallbackStep::Exact => fallback::EXACT,
            FallbackStep::PlatformDocType => fallback::PLATFORM_DOC_TYPE,
            FallbackStep::TechStackDocType => fallback::TECH_STACK_DOC_TYPE,
            FallbackStep::Builtin => fallback::BUILTIN,
        }
    }

    pub fn label(self, hit: bool) -> String {
        let outcome = if hit { fallback::HIT } else { fallback::MISS };
        format!("{}-{outcome}", self.name())
    }

    /// Store key probed by this step, `None` for the built-in default.
    pub fn key(self, request: &ResolutionRequest) -> Option<TemplateKey> {
        match self {
            FallbackStep::Exact => Some(TemplateKey::new(
                &request.platform,
                &request.document_type,
                &request.tech_stack,
            )),
            FallbackStep::PlatformDocType => Some(TemplateKey::new(
                &request.platform,
                &request.document_type,
                AGNOSTIC_TECH_STACK,
            )),
            FallbackStep::TechStackDocType => Some(TemplateKey::new(
                AGNOSTIC_PLATFORM,
                &request.document_type,
                &request.tech_stack,
            )),
            FallbackStep::Builtin => None,
        }
    }
}

/// The selected template and how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub merged: MergedTemplate,
    pub fallback_path: Vec<String>,
    pub step: FallbackStep,
}

/// The minimal template that terminates every fallback chain.
pub fn builtin_default() -> MergedTemplate {
    let mut variables = IndexMap::new();
    variables.insert(
        "title".to_string(),
        VariableSpec::optional().with_default(json!("Untitled document")),
    );
    variables.insert("description".to_string(), VariableSpec::optional());

    MergedTemplate {
        id: format!("{}/{}@{}", builtin::PLATFORM, builtin::DOCUMENT_TYPE, builtin::VERSION),
        key: None,
        version: builtin::VERSION.to_string(),
        description: Some("Built-in minimal default".to_string()),
        sections: vec![
            Section::new("Summary", "{{ title }}"),
            Section::new(
                "Description",
                "{{#if description}}{{ description }}{{#else}}No description provided.{{/if}}",
            ),
        ],
        variables,
        lineage: Vec::new(),
        source: PathBuf::new(),
    }
}

/// Walks the fallback chain over one store snapshot.
pub struct TemplateResolver<'s> {
    store: &'s TemplateStore,
}

impl<'s> TemplateResolver<'s> {
    pub fn new(store: &'s TemplateStore) -> Self {
        Self { store }
    }

    /// Resolves `request` to exactly one merged template.
    ///
    /// Lookup never comes back empty. The only failure is a selected
    /// template whose inheritance chain cannot be merged; that error carries
    /// the template id and the path taken so far.
    pub fn resolve(&self, request: &ResolutionRequest) -> Result<Resolution, GenerationError> {
        let mut fallback_path = Vec::with_capacity(FallbackStep::CHAIN.len());

        for step in FallbackStep::CHAIN {
            let Some(key) = step.key(request) else {
                fallback_path.push(step.label(true));
                debug!("Resolved {request} to the built-in default");
                return Ok(Resolution { merged: builtin_default(), fallback_path, step });
            };

            let Some(definition) = self.store.get(&key) else {
                fallback_path.push(step.label(false));
                continue;
            };
            fallback_path.push(step.label(true));
            debug!("Resolved {request} to {} via {}", definition.id(), step.name());

            return match AnchorMerger::new(self.store).merge(definition) {
                Ok(merged) => Ok(Resolution { merged, fallback_path, step }),
                Err(error) => Err(GenerationError {
                    error,
                    template_id: definition.id(),
                    fallback_path,
                    degraded: None,
                }),
            };
        }

        // The chain ends with the built-in step, which always returns above.
        Ok(Resolution {
            merged: builtin_default(),
            fallback_path,
            step: FallbackStep::Builtin,
        })
    }
}
