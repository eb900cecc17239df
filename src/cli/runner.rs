//! Command handlers behind the CLI.

use crate::{
    cli::{Cli, Commands, GenerateArgs, OutputFormat, ValidateArgs},
    config::EngineConfig,
    context::RenderContext,
    engine::Engine,
    error::{Error, Result},
    ioutils::write_file,
    request::{RenderOutput, ResolutionRequest},
    store::{validate_tree, TemplateStore},
};
use log::{info, warn};
use std::path::Path;

/// Dispatches a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate(&cli.root, &args),
        Commands::List => run_list(&cli.root),
        Commands::Validate(args) => run_validate(&cli.root, &args),
    }
}

/// Renders one document and writes it to stdout or `--output`.
///
/// Warnings go through `warn!`. When the engine is configured for degraded
/// fallback, the built-in default's output is still emitted before the
/// error is returned.
pub fn run_generate(root: &Path, args: &GenerateArgs) -> Result<()> {
    let engine = Engine::load(root)?;
    let context = match &args.context {
        Some(path) => RenderContext::from_file(path)?,
        None => RenderContext::default(),
    };
    let request = ResolutionRequest::new(&args.platform, &args.document_type, &args.tech_stack)
        .with_strictness(args.strictness(engine.config().default_strictness));

    match engine.generate(&request, &context) {
        Ok(output) => {
            info!(
                "Rendered {} via {}",
                output.template_id,
                output.fallback_path_taken.join(" -> ")
            );
            for warning in &output.warnings {
                warn!("{warning}");
            }
            emit(&output, args)
        }
        Err(err) => {
            if let Some(degraded) = &err.degraded {
                warn!("Emitting the built-in default in place of '{}'", err.template_id);
                emit(degraded, args)?;
            }
            Err(err.into())
        }
    }
}

fn emit(output: &RenderOutput, args: &GenerateArgs) -> Result<()> {
    let content = match args.format {
        OutputFormat::Text => output.rendered_text.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(output)?,
    };
    match &args.output {
        Some(path) => {
            write_file(&content, path)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

/// Prints every resolvable template and every fragment.
pub fn run_list(root: &Path) -> Result<()> {
    let config = EngineConfig::load(root)?;
    let store = TemplateStore::load(root, &config)?;

    let mut templates = store.templates().peekable();
    if templates.peek().is_none() {
        println!("No templates found under {}.", root.display());
        println!();
        println!("Every request resolves to the built-in default.");
    } else {
        println!("Templates:");
        println!();
        for definition in templates {
            let Some(key) = definition.key() else { continue };
            let marker = if store.is_broken(key) { " [broken]" } else { "" };
            println!(
                "  {} / {} / {}  v{}{marker}",
                key.platform, key.document_type, key.tech_stack, definition.version
            );
            if let Some(description) = &definition.description {
                println!("    Description: {description}");
            }
            println!("    Source: {}", definition.source.display());
            if let Some(reason) = store.broken().get(key) {
                println!("    Error: {reason}");
            }
            println!();
        }
    }

    let fragments: Vec<_> = store.fragments().filter_map(|f| f.fragment_name()).collect();
    if !fragments.is_empty() {
        println!("Fragments: {}", fragments.join(", "));
    }
    Ok(())
}

/// Checks a file or tree and prints each problem as `file:line: message`.
pub fn run_validate(root: &Path, args: &ValidateArgs) -> Result<()> {
    let path = args.path.as_deref().unwrap_or(root);
    let config_dir = if path.is_dir() { path } else { path.parent().unwrap_or(root) };
    let config = EngineConfig::load(config_dir)?;

    let diagnostics = validate_tree(path, &config)?;
    if diagnostics.is_empty() {
        println!("{}: all templates are valid.", path.display());
        return Ok(());
    }
    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }
    Err(Error::InvalidTemplates { count: diagnostics.len() })
}
