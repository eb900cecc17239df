use crate::constants::{exit_codes, verbosity, DEFAULT_TEMPLATE_ROOT, TEMPLATE_ROOT_ENV};
use crate::request::Strictness;
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::fmt::Display;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#;

/// How `generate` prints its result.
#[derive(Debug, Clone, ValueEnum, Copy, PartialEq, Default)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The rendered document only.
    #[default]
    Text,
    /// The full output object: text, template id, fallback path, warnings, sections.
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        };
        write!(f, "{s}")
    }
}

/// ticketsmith - layered ticket and document templates.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding the template definition files.
    #[arg(long, env = TEMPLATE_ROOT_ENV, default_value = DEFAULT_TEMPLATE_ROOT, global = true)]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the template selected for a platform, document type and tech stack.
    #[command(visible_alias = "gen")]
    Generate(GenerateArgs),

    /// List every resolvable template and fragment.
    #[command(visible_alias = "ls")]
    List,

    /// Check template files and report every problem found.
    Validate(ValidateArgs),
}

/// Arguments for the generate command.
#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Target platform, e.g. `jira`.
    #[arg(value_name = "PLATFORM")]
    pub platform: String,

    /// Kind of document, e.g. `component`.
    #[arg(value_name = "DOCUMENT_TYPE")]
    pub document_type: String,

    /// Technology stack, e.g. `react`.
    #[arg(value_name = "TECH_STACK")]
    pub tech_stack: String,

    /// JSON or YAML file with the render context, or `-` to read stdin.
    #[arg(short, long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Fail on any variable the context cannot satisfy.
    #[arg(long)]
    pub strict: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the result to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    /// `--strict` wins; otherwise the engine's configured default applies.
    pub fn strictness(&self, default: Strictness) -> Strictness {
        if self.strict {
            Strictness::Strict
        } else {
            default
        }
    }
}

/// Arguments for the validate command.
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Template file or directory. Defaults to the template root.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

/// Parse command line arguments with custom handling for missing required inputs.
pub fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| match e.kind() {
        ErrorKind::MissingRequiredArgument | ErrorKind::MissingSubcommand => {
            let mut command = Cli::command().help_template(HELP_TEMPLATE);
            if let Err(print_err) = command.print_help() {
                eprintln!("Failed to display help information: {print_err}");
            } else {
                println!();
            }
            std::process::exit(exit_codes::FAILURE);
        }
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => {
            if let Err(print_err) = e.print() {
                eprintln!("Failed to display usage error: {print_err}");
            }
            std::process::exit(exit_codes::FAILURE);
        }
    })
}

/// Map `-v` counts to the appropriate log level.
pub fn get_log_level_from_verbose(verbose_count: u8) -> LevelFilter {
    match verbose_count {
        verbosity::OFF => LevelFilter::Warn,
        verbosity::INFO => LevelFilter::Info,
        verbosity::DEBUG => LevelFilter::Debug,
        verbosity::TRACE.. => LevelFilter::Trace,
    }
}
