use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use backdrop_core::domain::{Artifact, HistoryQuery, OriginKind};
use backdrop_core::impls::SqliteRepository;
use backdrop_core::ports::Repository;
use backdrop_core::{AppBuilder, Config};

#[derive(Parser)]
#[command(name = "backdrop")]
#[command(about = "Rotates the desktop background from a remote gallery or a local folder")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.backdrop/config.json)
    #[arg(long, global = true, env = "BACKDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a new background now and then once per period (default)
    Run,
    /// Run a single cycle and exit
    Once {
        /// Print the applied artifact as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show previously applied backgrounds, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only images picked from a local directory
        #[arg(long, conflicts_with = "remote")]
        local: bool,
        /// Only downloaded images
        #[arg(long)]
        remote: bool,
        #[arg(long)]
        json: bool,
    },
    /// Delete every history row (cached files are left alone)
    ClearHistory {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Once { json } => once(&config, json).await,
        Command::History {
            limit,
            local,
            remote,
            json,
        } => history(&config, limit, local, remote, json).await,
        Command::ClearHistory { yes } => clear_history(&config, yes).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let path = Config::default_path();
            Config::load_or_default(&path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
    }
}

async fn run(config: &Config) -> Result<()> {
    let mut scheduler = AppBuilder::from_config(config)
        .and_then(AppBuilder::build)
        .context("failed to start scheduler")?;

    let interrupted = tokio::select! {
        result = scheduler.run() => {
            result.context("scheduler stopped")?;
            false
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            true
        }
    };
    if interrupted {
        info!(
            cycles = scheduler.stats().cycles_completed,
            "interrupted, exiting"
        );
    }
    Ok(())
}

async fn once(config: &Config, json: bool) -> Result<()> {
    let mut scheduler = AppBuilder::from_config(config)
        .and_then(AppBuilder::build)
        .context("failed to start scheduler")?;

    let artifact = scheduler.run_once().await.context("cycle failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        println!("{}", describe(&artifact));
    }
    Ok(())
}

async fn history(config: &Config, limit: usize, local: bool, remote: bool, json: bool) -> Result<()> {
    let repository = open_repository(config)?;

    let mut query = HistoryQuery::new().page(0, limit);
    if local {
        query = query.kind(OriginKind::Local);
    }
    if remote {
        query = query.kind(OriginKind::Remote);
    }
    let rows = repository
        .query(&query)
        .await
        .context("failed to read history")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("history is empty");
    }
    for artifact in &rows {
        println!("{}", describe(artifact));
    }
    Ok(())
}

async fn clear_history(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete history without --yes");
    }
    let repository = open_repository(config)?;
    repository
        .clear_all()
        .await
        .context("failed to clear history")?;
    println!("history cleared");
    Ok(())
}

fn open_repository(config: &Config) -> Result<SqliteRepository> {
    let path = config.db_path();
    SqliteRepository::open(&path)
        .with_context(|| format!("failed to open history database {}", path.display()))
}

fn describe(artifact: &Artifact) -> String {
    let title = if artifact.title.is_empty() {
        artifact.filename.as_str()
    } else {
        artifact.title.as_str()
    };
    let author = if artifact.author.is_empty() {
        String::new()
    } else {
        format!(" by {}", artifact.author)
    };
    format!(
        "{:>6}  {}  {title}{author}  <{}>",
        artifact.id.get(),
        artifact.fetched_at.format("%Y-%m-%d %H:%M:%S"),
        artifact.origin
    )
}
