mod checker;
mod commands;
mod config;
mod diagnostics;
mod error;
mod index;
mod mapping;
mod report;
mod resolver;
mod rewriter;
mod scanner;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

use crate::commands::BatchOptions;

/// Command-line interface.
#[derive(Parser)]
#[command(name = "linkfix", version, about = "Repair broken internal links in a documentation tree")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Documentation root. The checker runs here and `.linkfix.toml` is read from here.
    #[arg(default_value = ".", global = true, long)]
    root: PathBuf,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the link checker and list broken links per document
    Check,
    /// Resolve every broken link and rewrite the documents that contain it
    Fix {
        /// Print the report instead of writing documents and the report file
        #[arg(long)]
        dry_run: bool,
        /// Report destination (default from config: link_fix_report.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Edit per-section fallback mappings in .linkfix.toml
    Mapping {
        /// Mapping action to perform.
        #[command(subcommand)]
        action: MappingAction,
    },
    /// Rewrite links that still use the legacy section layout
    Migrate {
        /// Print the report instead of writing documents and the report file
        #[arg(long)]
        dry_run: bool,
        /// Report destination (default from config: link_fix_report.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show how one link would be resolved, and by which rule
    Resolve {
        /// Link target, e.g. `/engineers/csv.md#options`.
        link: String,
        /// Section of the referencing document, used to break ties.
        #[arg(long)]
        section: Option<String>,
    },
}

/// Subcommands for managing fallback mappings.
#[allow(clippy::arbitrary_source_item_ordering, reason = "field order is positional argument order")]
#[derive(Subcommand)]
enum MappingAction {
    /// Add or replace a mapping from a legacy short name to a document path
    Add {
        /// Section whose table receives the mapping.
        section: String,
        /// Legacy short name, as left after prefix stripping.
        name: String,
        /// Current document path, e.g. `data-engineering/gems/source-target/file/csv`.
        path: String,
    },
    /// List mappings in effect, including built-in ones
    List {
        /// Only list this section's mappings.
        #[arg(long)]
        section: Option<String>,
    },
    /// Remove a mapping from .linkfix.toml
    Remove {
        /// Section whose table holds the mapping.
        section: String,
        /// Legacy short name to remove.
        name: String,
    },
}

/// Dispatch a mapping subcommand.
///
/// # Errors
///
/// Returns errors from the mapping operation.
fn dispatch_mapping(root: &std::path::Path, action: MappingAction) -> Result<(), error::Error> {
    return match action {
        MappingAction::Add { name, path, section } => mapping::cmd_add(root, &section, &name, &path),
        MappingAction::List { section } => mapping::cmd_list(root, section.as_deref()),
        MappingAction::Remove { name, section } => mapping::cmd_remove(root, &section, &name),
    };
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let root = cli.root.as_path();

    let result = match cli.command {
        Commands::Check => commands::check(root),
        Commands::Fix { dry_run, report } => commands::fix(root, &BatchOptions { dry_run, report }),
        Commands::Mapping { action } => dispatch_mapping(root, action).map(|()| return ExitCode::SUCCESS),
        Commands::Migrate { dry_run, report } => commands::migrate(root, &BatchOptions { dry_run, report }),
        Commands::Resolve { link, section } => {
            commands::resolve(root, &link, section.as_deref()).map(|()| return ExitCode::SUCCESS)
        },
    };

    return match result {
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
        Ok(code) => code,
    };
}
