//! # hackscope CLI
//!
//! ## Usage
//!
//! ```bash
//! hackscope --config ./config/hackscope.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hackscope init` | Create the SQLite database and run schema migrations |
//! | `hackscope analyze <owner/repo>` | Cached, stored or fresh repository analysis |
//! | `hackscope reanalyze <owner/repo>` | Invalidate and recompute a repository analysis |
//! | `hackscope invalidate <owner/repo>` | Drop the stored and cached analysis |
//! | `hackscope project <id>` | Analyse a hackathon project page |
//! | `hackscope search [query] --tech <t>` | Page through stored project analyses |
//! | `hackscope random [--count <n>]` | Random sample of stored projects |
//! | `hackscope score <id>` | Judge scores for a project |
//! | `hackscope serve` | Start the HTTP API |
//!
//! Results are printed as pretty JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use hackscope::config;
use hackscope::db;
use hackscope::logging;
use hackscope::migrate;
use hackscope::orchestrator::AnalysisMode;
use hackscope::server;
use hackscope::services::Services;
use hackscope_core::catalog::{sample_size, ProjectQuery};
use hackscope_core::models::RepoKey;

/// hackscope: cached AI analyses of hackathon projects and their repositories.
#[derive(Parser)]
#[command(name = "hackscope", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hackscope.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Analyse a repository, serving cached or stored results when valid.
    Analyze {
        /// `owner/repo` or a `https://github.com/owner/repo` URL.
        repo: RepoKey,

        /// Fail when the repository does not exist instead of returning a
        /// basic placeholder.
        #[arg(long)]
        strict: bool,
    },

    /// Invalidate and recompute a repository analysis.
    Reanalyze { repo: RepoKey },

    /// Remove a repository analysis from the store and cache.
    Invalidate { repo: RepoKey },

    /// Analyse a hackathon project page by id.
    Project {
        id: String,

        /// Drop the existing analysis first.
        #[arg(long)]
        reanalyze: bool,
    },

    /// Search stored project analyses, newest first.
    Search {
        /// Matched against title, description, id and repository summary.
        query: Option<String>,

        /// Matched against tech-stack entries.
        #[arg(long)]
        tech: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Print a random sample of stored projects.
    Random {
        #[arg(long)]
        count: Option<usize>,
    },

    /// Score a project on innovation, technical depth, design and impact.
    Score { id: String },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.level);

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Analyze { repo, strict } => {
            let services = Services::from_config(&cfg).await?;
            let mode = if strict {
                AnalysisMode::Strict
            } else {
                AnalysisMode::Lenient
            };
            let outcome = services.repos.get_analysis(&repo, mode).await?;
            print_json(&outcome)?;
        }
        Commands::Reanalyze { repo } => {
            let services = Services::from_config(&cfg).await?;
            print_json(&services.repos.reanalyze(&repo).await?)?;
        }
        Commands::Invalidate { repo } => {
            let services = Services::from_config(&cfg).await?;
            print_json(&services.repos.invalidate_analysis(&repo).await)?;
        }
        Commands::Project { id, reanalyze } => {
            let services = Services::from_config(&cfg).await?;
            let outcome = if reanalyze {
                services.projects.reanalyze(&id).await?
            } else {
                services.projects.get_project(&id).await?
            };
            print_json(&outcome)?;
        }
        Commands::Search {
            query,
            tech,
            page,
            limit,
        } => {
            let services = Services::from_config(&cfg).await?;
            let query = ProjectQuery::new(query.as_deref(), tech.as_deref(), page, limit);
            print_json(&services.projects.search(&query).await?)?;
        }
        Commands::Random { count } => {
            let services = Services::from_config(&cfg).await?;
            print_json(&services.projects.sample(sample_size(count)).await?)?;
        }
        Commands::Score { id } => {
            let services = Services::from_config(&cfg).await?;
            print_json(&services.projects.score(&id).await?)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
