//! provkit: inspect the sample provider catalog.
//!
//! Usage:
//!   provkit list [--kind resource|data-source]
//!   provkit describe resource gitlab_project
//!   provkit lint [--config provkit.toml]
//!   provkit decode-id --resource gitlab_project_variable 7:API_TOKEN
//!   provkit encode-id --resource gitlab_project_variable 7 API_TOKEN
//!   provkit upgrade gitlab_project_variable --from 0 state.json
//!
//! The catalog is built and validated before any command runs; a broken
//! definition exits non-zero.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use provkit_cli::{commands, sample, KindArg};
use provkit_registry::{LintConfig, CONFIG_FILE_NAME};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "provkit")]
#[command(about = "Inspect provider schemas, identifiers and state migrations")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered resources and data sources
    List {
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
    },
    /// Print the schema of a definition as JSON
    Describe {
        #[arg(value_enum)]
        kind: KindArg,
        name: String,
    },
    /// Run static checks over every schema
    Lint {
        /// Path to the lint configuration
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,
    },
    /// Split a composite identifier into its parts
    DecodeId {
        id: String,
        /// Use the identifier layout of this resource
        #[arg(short, long)]
        resource: Option<String>,
        /// Number of parts when no resource is given
        #[arg(short, long, default_value_t = 2)]
        arity: usize,
    },
    /// Join parts into a composite identifier
    EncodeId {
        #[arg(required = true, num_args = 2..)]
        parts: Vec<String>,
        /// Check the parts against this resource's identifier layout
        #[arg(short, long)]
        resource: Option<String>,
    },
    /// Upgrade a persisted JSON state document to the current schema version
    Upgrade {
        resource: String,
        /// Schema version the state was written with
        #[arg(long)]
        from: u32,
        /// Path to the state document
        file: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let catalog = sample::catalog().context("Failed to build the provider catalog")?;
    debug!(command = ?args.command, "Catalog ready");

    match args.command {
        Command::List { kind } => {
            for line in commands::list(&catalog, kind.map(Into::into)) {
                println!("{line}");
            }
        }
        Command::Describe { kind, name } => {
            println!("{}", commands::describe(&catalog, kind.into(), &name)?);
        }
        Command::Lint { config } => {
            let config = LintConfig::load_from(&config);
            let findings = commands::lint(&catalog, &config);
            for finding in &findings {
                println!("{finding}");
            }
            if !findings.is_empty() {
                info!("{} lint finding(s)", findings.len());
                return Ok(ExitCode::FAILURE);
            }
            info!("No lint findings");
        }
        Command::DecodeId { id, resource, arity } => {
            for (label, part) in commands::decode_id(resource.as_deref(), arity, &id)? {
                println!("{label}\t{part}");
            }
        }
        Command::EncodeId { parts, resource } => {
            println!("{}", commands::encode_id(resource.as_deref(), &parts)?);
        }
        Command::Upgrade { resource, from, file } => {
            let document = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read state file {:?}", file))?;
            println!("{}", commands::upgrade(&catalog, &resource, from, &document)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
