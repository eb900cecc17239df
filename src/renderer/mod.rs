//! Template parsing and rendering
//!
//! - `parser`: tokenizes `{{ }}` tags into a block tree
//! - `filters`: the closed filter set
//! - `engine`: the interpreter and section assembly
//! - `interface`: the renderer trait used by the engine facade

pub mod engine;
pub mod filters;
pub mod interface;
pub mod parser;

pub use engine::BlockRenderer;
pub use interface::{RenderedDocument, TemplateRenderer};
pub use parser::{parse, Node};
