use crate::constants::exit_codes;
use crate::request::RenderOutput;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON. Original error: {0}")]
    JSONParseError(#[from] serde_json::Error),

    #[error("Failed to parse YAML. Original error: {0}")]
    YAMLParseError(#[from] serde_yaml::Error),

    #[error("Failed to build glob set. Original error: {0}")]
    GlobSetParseError(#[from] globset::Error),

    #[error("Failed to walk template directory. Original error: {0}")]
    WalkDirError(#[from] walkdir::Error),

    /// Malformed template file. `line` is one-based.
    #[error("{}:{line}: {message}", .file.display())]
    ParseError { file: PathBuf, line: usize, message: String },

    #[error("Duplicate definition for '{key}' in '{}' (first defined in '{}').", .second.display(), .first.display())]
    DuplicateDefinitionError { key: String, first: PathBuf, second: PathBuf },

    #[error("Cyclic inheritance: {chain}.")]
    CyclicInheritanceError { chain: String },

    #[error("Fragment '{name}' referenced by '{referenced_by}' does not exist.")]
    FragmentNotFoundError { name: String, referenced_by: String },

    #[error("Unresolved variable '{path}'.")]
    UnresolvedVariableError { path: String },

    #[error("Unknown filter '{name}'.")]
    UnknownFilterError { name: String },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}.")]
    TypeMismatchError { path: String, expected: String, found: String },

    #[error("Unbalanced block '{block}': {detail}.")]
    UnbalancedBlockError { block: String, detail: String },

    #[error("Invalid expression '{expression}'.")]
    InvalidExpressionError { expression: String },

    #[error("Invalid render context: {0}.")]
    InvalidContext(String),

    #[error("Configuration error: {0}.")]
    ConfigValidation(String),

    #[error("Cannot proceed: template directory '{template_dir}' does not exist.")]
    TemplateRootDoesNotExist { template_dir: String },

    #[error("Validation failed: {count} problem(s) found.")]
    InvalidTemplates { count: usize },

    #[error("{0}")]
    GenerationFailed(Box<GenerationError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// True for failures scoped to a single resolution/render call.
    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            Error::CyclicInheritanceError { .. }
                | Error::FragmentNotFoundError { .. }
                | Error::UnresolvedVariableError { .. }
                | Error::UnknownFilterError { .. }
                | Error::TypeMismatchError { .. }
                | Error::UnbalancedBlockError { .. }
                | Error::InvalidExpressionError { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        if let Error::GenerationFailed(err) = self {
            return err.exit_code();
        }
        if self.is_render_error() {
            exit_codes::RENDER_FAILURE
        } else {
            exit_codes::FAILURE
        }
    }
}

/// Convenience type alias for Results with the crate error type.
///
/// # Type Parameters
/// * `T` - The type of the success value
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A render-time failure together with what the resolver did before it failed.
#[derive(Error, Debug)]
#[error("Failed to generate '{template_id}' (path: {}): {error}", .fallback_path.join(" -> "))]
pub struct GenerationError {
    #[source]
    pub error: Error,
    pub template_id: String,
    pub fallback_path: Vec<String>,
    /// Output of the built-in default, when degraded fallback is enabled.
    pub degraded: Option<RenderOutput>,
}

impl GenerationError {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

impl From<GenerationError> for Error {
    fn from(err: GenerationError) -> Self {
        Error::GenerationFailed(Box::new(err))
    }
}

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with the error's exit code
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(err.exit_code());
}
