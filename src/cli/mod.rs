//! Command line interface
//!
//! - `args`: clap definitions and verbosity mapping
//! - `runner`: handlers for `generate`, `list` and `validate`

pub mod args;
pub mod runner;

pub use args::{
    get_log_level_from_verbose, parse_cli, Cli, Commands, GenerateArgs, OutputFormat, ValidateArgs,
};
pub use runner::{run, run_generate, run_list, run_validate};
