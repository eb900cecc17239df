/// Resolves variable references against the render context.
pub mod binder;

/// Memoizes rendered outputs per request and context.
pub mod cache;

/// Handles argument parsing.
pub mod cli;

/// Configuration handling for the template root.
pub mod config;

/// Constants shared across modules.
pub mod constants;

/// Typed render context.
pub mod context;

/// Ties resolution, binding, rendering and caching together.
pub mod engine;

/// Defines custom error types.
pub mod error;

/// Extension traits for standard library types.
pub mod ext;

/// A set of helpers for working with the file system.
pub mod ioutils;

/// Fragment inheritance.
pub mod merge;

/// Template body parsing and rendering.
pub mod renderer;

/// Request and output types.
pub mod request;

/// Fallback chain from a request to a single template.
pub mod resolver;

/// Template discovery, parsing, indexing and validation.
pub mod store;

pub use engine::Engine;
pub use error::{Error, GenerationError, Result};
pub use request::{RenderOutput, ResolutionRequest, Strictness};
