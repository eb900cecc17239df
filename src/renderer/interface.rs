use crate::binder::Bindings;
use crate::error::Result;
use crate::merge::MergedTemplate;
use crate::request::RenderedSection;

/// A fully rendered template, before it is wrapped into a `RenderOutput`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub text: String,
    pub sections: Vec<RenderedSection>,
    pub warnings: Vec<String>,
}

/// Trait for template rendering engines.
pub trait TemplateRenderer: Send + Sync {
    /// Renders every section of `template` against `bindings`.
    ///
    /// # Arguments
    /// * `template` - Merged template to render
    /// * `bindings` - Context flattened against the template's variable schema
    ///
    /// # Returns
    /// * `Result<RenderedDocument>` - All sections rendered, or the first error.
    ///   No partial output is produced on failure.
    fn render(&self, template: &MergedTemplate, bindings: &Bindings<'_>)
        -> Result<RenderedDocument>;

    /// Checks that a section body parses, without rendering it.
    ///
    /// # Arguments
    /// * `body` - Section body text
    ///
    /// # Returns
    /// * `Result<()>` - Unbalanced blocks, unknown filters and malformed tags
    ///   are reported as errors
    fn check(&self, body: &str) -> Result<()>;
}
