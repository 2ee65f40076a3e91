use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use repograph_core::{CategorySpec, FileCategoryAssignment, OutputFormat};
use repograph_deps::{
    CategorizeRequest, CategoryGenerator, CategoryManager, DependencyDriller, RouteCategories,
};

const DEFAULT_CONFIG_FILE: &str = "repograph.toml";

#[derive(Parser)]
#[command(
    name = "repograph",
    version,
    about = "Static import graph and keyword extraction for repository knowledge graphs",
    long_about = "Repograph scans a repository's working tree, extracts static imports from\n\
                   JavaScript, TypeScript, and PHP files, and records import edges and\n\
                   per-file keywords for files already known to the graph store.\n\n\
                   Examples:\n  \
                     repograph init                       Write a default repograph.toml\n  \
                     repograph register                   Record working tree files as known\n  \
                     repograph deps                       Extract imports and keywords\n  \
                     repograph categorize --categories-json cats.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: repograph.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override project_id from the config
    #[arg(long, global = true)]
    project_id: Option<String>,

    /// Extra gitignore-style file with paths to exclude
    #[arg(long, global = true)]
    ignore_file: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file
    Init,
    /// Register every working tree file as a known file
    #[command(long_about = "Register every working tree file as a known file.\n\n\
        Computes each scanned file's identity and upserts it into the store, so\n\
        that `repograph deps` has files to connect on a fresh database.")]
    Register,
    /// Extract static imports and keywords from the working tree
    #[command(long_about = "Extract static imports and keywords from the working tree.\n\n\
        Only files already known to the store take part. Prints the number of\n\
        import edges and keyword rows written.\n\n\
        Examples:\n  repograph deps\n  repograph deps --ignore-file extra.ignore --format json")]
    Deps,
    /// Merge categories and file-category assignments
    #[command(long_about = "Merge categories and file-category assignments.\n\n\
        Inputs are JSON arrays:\n  \
          --categories-json   [{\"name\", \"description\", \"url\"}]\n  \
          --assignments-json  [{\"category\", \"path\" | \"merge_hash\", \"confidence\"}]\n  \
          --routes            [\"/files\", ...] (with --auto-categories)")]
    Categorize {
        /// JSON array of categories
        #[arg(long)]
        categories_json: Option<PathBuf>,
        /// JSON array of file-to-category assignments
        #[arg(long)]
        assignments_json: Option<PathBuf>,
        /// JSON array of route strings
        #[arg(long)]
        routes: Option<PathBuf>,
        /// Create categories for routes that have none
        #[arg(long)]
        auto_categories: bool,
        /// Project that owns the assigned categories (default: --project-id)
        #[arg(long)]
        category_project_id: Option<String>,
    },
}

const DEFAULT_CONFIG: &str = r#"# Repograph Configuration

[store]
# SQLite graph store, relative to this file
database = ".repograph/graph.db"
# Rows written per transaction
# batch_size = 100

[project]
# Working tree root, relative to this file
repo = "."
project_id = "{project_id}"
# Extra gitignore-style exclusions
# ignore_file = "repograph.ignore"
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    let dispatch = build_dispatch(cli.verbose);

    match cli.command {
        Command::Init => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            if path.exists() {
                miette::bail!("{} already exists", path.display());
            }
            let project_id = cli.project_id.as_deref().unwrap_or("my-project");
            std::fs::write(&path, DEFAULT_CONFIG.replace("{project_id}", project_id))
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            println!("Created {} with default configuration", path.display());
        }
        Command::Register => {
            let config = config_path(&cli)?;
            let driller =
                DependencyDriller::open(&config, cli.project_id.clone(), cli.ignore_file.clone())?
                    .with_dispatch(dispatch);
            let registered = driller.register()?;
            match cli.format {
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "registered": registered }))?;
                }
                OutputFormat::Text => println!("Registered {registered} files"),
            }
        }
        Command::Deps => {
            let config = config_path(&cli)?;
            let driller =
                DependencyDriller::open(&config, cli.project_id.clone(), cli.ignore_file.clone())?
                    .with_dispatch(dispatch);
            let summary = driller.run()?;
            match cli.format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Text => println!("Deps run complete: {summary}"),
            }
        }
        Command::Categorize {
            ref categories_json,
            ref assignments_json,
            ref routes,
            auto_categories,
            ref category_project_id,
        } => {
            let config = config_path(&cli)?;
            let manager =
                CategoryManager::open(&config, cli.project_id.clone())?.with_dispatch(dispatch);

            let request = CategorizeRequest {
                categories: load_json_list::<CategorySpec>(categories_json.as_deref())?,
                assignments: load_json_list::<FileCategoryAssignment>(
                    assignments_json.as_deref(),
                )?,
                routes: if auto_categories {
                    Some(load_json_list::<String>(routes.as_deref())?)
                } else {
                    None
                },
                category_project_id: category_project_id.clone(),
            };
            let generator: &dyn CategoryGenerator = &RouteCategories;
            let summary = manager.categorize(&request, Some(generator))?;

            match cli.format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Text => println!(
                    "Category run complete: categories_total={}, categories_created={}, assigned={}",
                    summary.categories_total, summary.categories_created, summary.assigned
                ),
            }
        }
    }

    Ok(())
}

/// Subscriber writing to stderr. `RUST_LOG` wins over `--verbose`.
fn build_dispatch(verbose: bool) -> Dispatch {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    Dispatch::new(subscriber)
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.config {
        return Ok(path.clone());
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        return Ok(default_path);
    }
    miette::bail!(miette::miette!(
        help = "Pass --config <path> or run `repograph init` to create repograph.toml",
        "No configuration file found"
    ));
}

/// Read a JSON array from `path`. No path means an empty list.
fn load_json_list<T: DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid JSON in {}", path.display()))?;
    if !value.is_array() {
        miette::bail!("Expected a JSON array in {}", path.display());
    }
    serde_json::from_value(value)
        .into_diagnostic()
        .wrap_err_with(|| format!("unexpected entry in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).into_diagnostic()?
    );
    Ok(())
}
