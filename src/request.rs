//! Request and response types at the engine boundary.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Policy for variable references that the context cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Missing paths render as an empty string and record a warning.
    #[default]
    Lenient,
    /// Missing paths fail the render with `UnresolvedVariableError`.
    Strict,
}

impl Display for Strictness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strictness::Lenient => "lenient",
            Strictness::Strict => "strict",
        };
        write!(f, "{s}")
    }
}

/// What the caller wants rendered. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub platform: String,
    pub document_type: String,
    pub tech_stack: String,
    #[serde(default)]
    pub strictness: Strictness,
}

impl ResolutionRequest {
    pub fn new(
        platform: impl Into<String>,
        document_type: impl Into<String>,
        tech_stack: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            document_type: document_type.into(),
            tech_stack: tech_stack.into(),
            strictness: Strictness::default(),
        }
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }
}

impl Display for ResolutionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.platform, self.document_type, self.tech_stack, self.strictness
        )
    }
}

/// One rendered section of the final document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSection {
    pub name: String,
    pub text: String,
}

/// Successful result handed to the delivery layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub rendered_text: String,
    pub template_id: String,
    pub fallback_path_taken: Vec<String>,
    pub warnings: Vec<String>,
    pub sections: Vec<RenderedSection>,
}
