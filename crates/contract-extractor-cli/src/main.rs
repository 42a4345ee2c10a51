//! Contract extractor CLI.
//!
//! Slices the public message contracts of one or more bounded contexts out of
//! a TypeScript source tree.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, WrapErr};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use contract_extractor::config::{MarkerNames, DEFAULT_EXCLUDES};
use contract_extractor::frontend::TypeScriptFrontend;
use contract_extractor::types::render::to_ts_type;
use contract_extractor::{
    extract_workspace, Discovery, ExtractResult, Extractor, ExtractorConfig, ExtractorError, OsFileSystem,
    WorkspaceConfig,
};

mod ui;

#[derive(Parser)]
#[command(name = "contract-extractor")]
#[command(about = "Extracts public event/command/query contracts from a TypeScript source tree")]
#[command(version)]
struct Cli {
    /// Log pipeline progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every configured context into the output package
    Extract {
        /// Workspace configuration file
        #[arg(short, long, default_value = "contracts.json")]
        config: PathBuf,

        /// Only extract this context
        #[arg(long)]
        context: Option<String>,
    },

    /// List marked messages below a source directory
    Scan {
        /// Source directory
        #[arg(short, long, default_value = "src")]
        source: PathBuf,

        #[command(flatten)]
        markers: MarkerArgs,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Print the dependency graph of the marked files
    Graph {
        /// Source directory
        #[arg(short, long, default_value = "src")]
        source: PathBuf,

        /// Exclusion glob; replaces the defaults when given
        #[arg(short, long)]
        exclude: Vec<String>,

        #[command(flatten)]
        markers: MarkerArgs,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Load and validate the workspace configuration
    Check {
        /// Workspace configuration file
        #[arg(short, long, default_value = "contracts.json")]
        config: PathBuf,
    },
}

#[derive(clap::Args)]
struct MarkerArgs {
    /// Event marker decorator
    #[arg(long, default_value = "PublicEvent")]
    event_marker: String,

    /// Command marker decorator
    #[arg(long, default_value = "PublicCommand")]
    command_marker: String,

    /// Query marker decorator
    #[arg(long, default_value = "PublicQuery")]
    query_marker: String,
}

impl MarkerArgs {
    fn names(&self) -> MarkerNames {
        MarkerNames {
            event: self.event_marker.clone(),
            command: self.command_marker.clone(),
            query: self.query_marker.clone(),
        }
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Extract { config, context } => run_extract(&config, context.as_deref()),
        Commands::Scan { source, markers, json } => run_scan(&source, &markers, json),
        Commands::Graph {
            source,
            exclude,
            markers,
            json,
        } => run_graph(&source, exclude, &markers, json),
        Commands::Check { config } => run_check(&config),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "contract_extractor=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Reads `contracts.json`; relative paths in it are anchored at its directory.
fn load_workspace(path: &Path) -> Result<(WorkspaceConfig, PathBuf), ExtractorError> {
    let text = std::fs::read_to_string(path).map_err(|e| ExtractorError::read(path, &e))?;
    let workspace = WorkspaceConfig::from_json(path, &text)?;
    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    debug!(config = %path.display(), contexts = workspace.contexts.len(), "loaded workspace");
    Ok((workspace, root))
}

fn run_extract(config_path: &Path, only: Option<&str>) -> miette::Result<()> {
    let start = Instant::now();
    let (workspace, root) = load_workspace(config_path)?;
    let mut configs = workspace.resolve(&root)?;
    if let Some(name) = only {
        configs.retain(|c| c.context_name == name);
        if configs.is_empty() {
            return Err(ExtractorError::config("context", format!("no context named '{}'", name)).into());
        }
    }

    let spinner = ui::spinner(&format!("Extracting {} context(s)...", configs.len()));
    let result = extract_workspace(&configs, &workspace.options(&root), &OsFileSystem);
    spinner.finish_and_clear();
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            ui::error_header();
            return Err(e.into());
        }
    };

    ui::box_header("CONTEXTS");
    ui::box_line("");
    for context in &result.contexts {
        context_line(context);
    }
    ui::box_line("");
    ui::box_footer();
    println!();

    if let Some(path) = &result.registry_path {
        ui::success(&format!("registry  {}", path.display()));
    }
    if !result.reexport_files.is_empty() {
        ui::success(&format!("{} re-export shim(s)", result.reexport_files.len()));
    }
    for warning in &result.warnings {
        ui::warning(warning);
    }
    for error in &result.generator_errors {
        ui::error(&error.to_string());
    }

    ui::timing("Done", start.elapsed().as_millis());
    Ok(())
}

fn context_line(context: &ExtractResult) {
    let stats = context.stats();
    ui::context_line(
        &context.context_name,
        stats.events,
        stats.commands,
        stats.queries,
        stats.files_written,
        stats.rewrites,
    );
    if stats.excluded > 0 {
        ui::dim(&format!("      {} excluded dependency file(s)", stats.excluded));
    }
}

/// Config rooted at `source` for the read-only commands; nothing is written.
fn adhoc_config(source: &Path, markers: &MarkerArgs) -> ExtractorConfig {
    let mut config = ExtractorConfig::new("scan", source, "contracts");
    config.markers = markers.names();
    config
}

fn discover(config: &ExtractorConfig) -> miette::Result<(Discovery, TypeScriptFrontend)> {
    let mut frontend = TypeScriptFrontend::new()?;
    let discovery = Extractor::new(config.clone())
        .discover(&OsFileSystem, &mut frontend)
        .wrap_err_with(|| format!("while scanning {}", config.source_dir.display()))?;
    Ok((discovery, frontend))
}

fn run_scan(source: &Path, markers: &MarkerArgs, json: bool) -> miette::Result<()> {
    let config = adhoc_config(source, markers);
    let (discovery, _) = discover(&config)?;
    let messages = discovery.messages();

    if json {
        let text = serde_json::to_string_pretty(&messages).into_diagnostic()?;
        println!("{}", text);
        return Ok(());
    }

    if messages.is_empty() {
        ui::info(&format!("No marked messages below {}", source.display()));
        return Ok(());
    }
    for path in &discovery.entry_points {
        let Some(contract) = discovery.contracts.get(path) else { continue };
        let relative = path.strip_prefix(source).unwrap_or(path);
        ui::tree_dir("", &relative.display().to_string());
        let count = contract.messages.len();
        for (i, message) in contract.messages.iter().enumerate() {
            let mut detail = message.message_type.to_string();
            if let Some(payload) = &message.payload_type {
                detail.push_str(&format!("  {}", to_ts_type(payload)));
            }
            if let Some(result) = &message.result_type {
                detail.push_str(&format!("  -> {}", to_ts_type(result)));
            }
            ui::tree_item("  ", &message.name, Some(&detail), i + 1 == count);
        }
    }
    println!();
    ui::info(&format!(
        "{} message(s) in {} file(s), {} candidate(s) scanned",
        messages.len(),
        discovery.entry_points.len(),
        discovery.candidates.len()
    ));
    Ok(())
}

fn run_graph(source: &Path, exclude: Vec<String>, markers: &MarkerArgs, json: bool) -> miette::Result<()> {
    let mut config = adhoc_config(source, markers);
    config.exclude_dependencies = if exclude.is_empty() {
        DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
    } else {
        exclude
    };
    config.validate()?;

    let (discovery, mut frontend) = discover(&config)?;
    let graph = Extractor::new(config)
        .build_graph(&OsFileSystem, &mut frontend, &discovery.entry_points)?;

    if json {
        let text = serde_json::to_string_pretty(&graph).into_diagnostic()?;
        println!("{}", text);
        return Ok(());
    }

    for node in graph.ordered_nodes() {
        let marker = if node.is_entry_point { ui::symbols::TARGET_FILLED } else { ui::symbols::TARGET_EMPTY };
        ui::node_line(marker, &node.relative_path.display().to_string());
        let locals: Vec<_> = node.local_dependencies().collect();
        for (i, dep) in locals.iter().enumerate() {
            let relative = dep.strip_prefix(source).unwrap_or(dep);
            ui::tree_item("  ", &relative.display().to_string(), None, i + 1 == locals.len());
        }
    }
    if !graph.excluded_paths.is_empty() {
        println!();
        ui::dim("excluded:");
        for path in &graph.excluded_paths {
            let relative = path.strip_prefix(source).unwrap_or(path);
            ui::dim(&format!("  {}", relative.display()));
        }
    }
    println!();
    ui::info(&format!(
        "{} file(s), {} entry point(s), {} excluded",
        graph.len(),
        graph.entry_points.len(),
        graph.excluded_paths.len()
    ));
    Ok(())
}

fn run_check(config_path: &Path) -> miette::Result<()> {
    let (workspace, root) = match load_workspace(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            ui::nope_header();
            return Err(e.into());
        }
    };
    let configs = match workspace.resolve(&root) {
        Ok(configs) => configs,
        Err(e) => {
            ui::nope_header();
            return Err(e.into());
        }
    };

    ui::looking_good();
    println!();
    for config in &configs {
        let filter = config
            .message_types
            .as_ref()
            .map(|kinds| kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", "))
            .unwrap_or_else(|| "all".to_string());
        println!(
            "    {} {} {}",
            config.context_name,
            ui::symbols::DOT,
            config.source_dir.display()
        );
        ui::dim(&format!("      messages: {}", filter));
    }
    let options = workspace.options(&root);
    println!();
    ui::dim(&format!("    output: {}", options.output_dir.display()));
    if options.registry.is_some() {
        ui::dim("    registry: on");
    }
    if options.generate_reexports {
        ui::dim("    re-exports: on");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_load_workspace_anchors_at_config_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contracts.json");
        std::fs::write(
            &path,
            r#"{ "outputDir": "out", "contexts": [{ "name": "users", "sourceDir": "src/users" }] }"#,
        )
        .unwrap();

        let (workspace, root) = load_workspace(&path).unwrap();
        assert_eq!(root, dir.path());
        let configs = workspace.resolve(&root).unwrap();
        assert_eq!(configs[0].source_dir, dir.path().join("src/users"));
    }

    #[test]
    fn test_missing_config_is_not_found() {
        let err = load_workspace(Path::new("/definitely/not/here/contracts.json")).unwrap_err();
        assert!(matches!(err, ExtractorError::NotFound { .. }));
    }
}
