// src/main.rs
//! Ralph Package Manager - CLI Entry Point

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use ralph::{CredentialKind, CredentialResponse};
use std::io;
use std::path::PathBuf;
use std::process;

mod commands;

// =============================================================================
// CLI Definitions
// =============================================================================

#[derive(Parser)]
#[command(name = "ralph")]
#[command(author = "Ralph Contributors")]
#[command(version)]
#[command(about = "Source-level package manager for native projects", long_about = None)]
struct Cli {
    /// Project directory to operate in
    #[arg(short = 'C', long, global = true, default_value = ".")]
    directory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage package sources
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },

    /// Install packages into a group
    Install {
        /// Packages as name[@requirement]
        #[arg(required = true)]
        packages: Vec<String>,

        /// Installation group
        #[arg(long, default_value = "")]
        group: String,

        /// Configuration entries as KEY=VALUE
        #[arg(long = "config")]
        config: Vec<String>,
    },

    /// Remove installed packages from a group
    Remove {
        /// Packages as name[@requirement]
        #[arg(required = true)]
        packages: Vec<String>,

        /// Installation group
        #[arg(long, default_value = "")]
        group: String,
    },

    /// Check that packages are installed in a group
    Check {
        /// Packages as name[@requirement]
        #[arg(required = true)]
        packages: Vec<String>,

        /// Installation group
        #[arg(long, default_value = "")]
        group: String,
    },

    /// Search package names with a wildcard
    Search {
        /// Wildcard pattern (* and ?)
        pattern: String,
    },

    /// Create a new project
    New {
        /// Project name
        name: String,

        /// Build system to scaffold
        #[arg(long, default_value = "cmake", value_parser = ["cmake", "none"])]
        build_system: String,

        /// Version control system to initialize
        #[arg(long, default_value = "git", value_parser = ["git", "none"])]
        version_control_system: String,
    },

    /// Verify the project manifest
    Verify,

    /// Show available database locations
    Info,

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SourcesAction {
    /// List sources, including outer scopes for visibility
    List {
        #[arg(long, default_value = "project", value_parser = ["project", "user", "system"])]
        database: String,
    },

    /// Register a new source
    Add {
        /// Source name
        name: String,

        /// Remote URL of the index repository
        url: String,

        #[arg(long, default_value = "project", value_parser = ["project", "user", "system"])]
        database: String,
    },

    /// Unregister a source and delete its mirror
    Remove {
        /// Source name
        name: String,

        #[arg(long, default_value = "project", value_parser = ["project", "user", "system"])]
        database: String,
    },

    /// Show one source
    Show {
        /// Source name
        name: String,

        #[arg(long, default_value = "project", value_parser = ["project", "user", "system"])]
        database: String,
    },

    /// Synchronize sources with their remotes
    Update {
        /// Source names (all sources when omitted)
        names: Vec<String>,

        #[arg(long, default_value = "project", value_parser = ["project", "user", "system"])]
        database: String,
    },
}

/// Non-interactive credential answer: offer the default mechanism where
/// allowed; interactive prompting is layered on by the embedding terminal
fn install_credential_callback() {
    ralph::set_credential_callback(|query| {
        if query.allows(CredentialKind::Default) {
            CredentialResponse::Default
        } else {
            CredentialResponse::Invalid
        }
    });
}

fn run(cli: Cli) -> Result<()> {
    let dir = cli.directory.as_path();
    match cli.command {
        Commands::Sources { action } => match action {
            SourcesAction::List { database } => commands::cmd_sources_list(&database, dir),
            SourcesAction::Add { name, url, database } => {
                commands::cmd_sources_add(&name, &url, &database, dir)
            }
            SourcesAction::Remove { name, database } => {
                commands::cmd_sources_remove(&name, &database, dir)
            }
            SourcesAction::Show { name, database } => {
                commands::cmd_sources_show(&name, &database, dir)
            }
            SourcesAction::Update { names, database } => {
                commands::cmd_sources_update(&names, &database, dir)
            }
        },

        Commands::Install { packages, group, config } => {
            commands::cmd_install(&packages, &group, &config, dir)
        }

        Commands::Remove { packages, group } => commands::cmd_remove(&packages, &group, dir),

        Commands::Check { packages, group } => commands::cmd_check(&packages, &group, dir),

        Commands::Search { pattern } => commands::cmd_search(&pattern, dir),

        Commands::New { name, build_system, version_control_system } => {
            commands::cmd_new(&name, &build_system, &version_control_system, dir)
        }

        Commands::Verify => commands::cmd_verify(dir),

        Commands::Info => commands::cmd_info(dir),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ralph", &mut io::stdout());
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    install_credential_callback();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<ralph::Error>()
            .map(ralph::Error::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}
