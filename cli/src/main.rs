// meshnode-cli — run and inspect a mesh node from the desktop
//
// Cross-platform (macOS, Linux, Windows) command-line interface.

mod config;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use meshnode_core::{IdentityPersistence, MeshNode, NodeConfig};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "meshnode")]
#[command(about = "Mesh node — identity and relay directory", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Directory overrides shared by commands that start a node
#[derive(clap::Args)]
struct NodeArgs {
    /// Storage directory (identity database)
    #[arg(long)]
    storage: Option<PathBuf>,
    /// Cache directory
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Use a throwaway identity for this run
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node with an interactive prompt
    Start {
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Print this node's public key
    Identity {
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Validate a server key and print its canonical form
    ParseKey { key: String },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    /// Show where the config file lives
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let log_dir = if config.log_to_file {
        Some(config.cache_dir()?)
    } else {
        None
    };
    let _log_guard = init_logging(log_dir.as_deref())?;

    match cli.command {
        Commands::Start { node } => cmd_start(&config, node).await,
        Commands::Identity { node } => cmd_identity(&config, node),
        Commands::ParseKey { key } => cmd_parse_key(&key),
        Commands::Config { action } => cmd_config(config, action),
    }
}

/// Console logging (default `warn`), plus a daily log file when `log_dir` is set.
fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("Failed to create log directory")?;
            let appender = tracing_appender::rolling::daily(dir, "meshnode.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Build the node and its directories from config plus command-line overrides
fn prepare_node(config: &config::Config, args: NodeArgs) -> Result<(MeshNode, PathBuf, PathBuf)> {
    let storage = match args.storage {
        Some(path) => path,
        None => config.storage_dir()?,
    };
    let cache = match args.cache {
        Some(path) => path,
        None => config.cache_dir()?,
    };

    let mut node_config: NodeConfig = config.node.clone();
    if args.ephemeral {
        node_config.identity_persistence = IdentityPersistence::Ephemeral;
    }

    Ok((MeshNode::new(node_config), storage, cache))
}

async fn cmd_start(config: &config::Config, args: NodeArgs) -> Result<()> {
    use tokio::io::AsyncBufReadExt;

    let (node, storage, cache) = prepare_node(config, args)?;
    tracing::info!(
        storage = %storage.display(),
        cache = %cache.display(),
        persistence = ?node.config().identity_persistence,
        "Starting mesh node"
    );
    node.start(&storage, &cache).context("Failed to start node")?;

    let public_key = node
        .public_key()
        .map(|key| key.to_hex())
        .unwrap_or_default();

    println!("{}", "Mesh node — Running".bold());
    println!();
    println!("Public key: {}", public_key.bright_cyan());
    println!("Storage:    {}", storage.display());
    println!("Cache:      {}", cache.display());
    println!();
    println!("{}", "Commands:".bold());
    println!("{}", repl::help_text());
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        prompt();
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                println!();
                break;
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };

        let Some(line) = line else {
            tracing::debug!("stdin closed");
            break;
        };

        match repl::parse_line(&line) {
            Ok(repl::ReplCommand::Quit) => break,
            Ok(cmd) => {
                let output = repl::execute(&node, &cmd);
                if !output.is_empty() {
                    println!("{}", output);
                }
            }
            Err(e) => {
                tracing::debug!("Rejected input {:?}: {}", line, e);
                println!("{} {}", "✗".red(), e);
            }
        }
    }

    println!("Shutting down...");
    node.stop();
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

fn cmd_identity(config: &config::Config, args: NodeArgs) -> Result<()> {
    let (node, storage, cache) = prepare_node(config, args)?;
    node.start(&storage, &cache).context("Failed to start node")?;

    let public_key = node
        .public_key()
        .context("Node started without a public key")?;
    node.stop();

    println!("{}", public_key);
    Ok(())
}

fn cmd_parse_key(key: &str) -> Result<()> {
    let identity = meshnode_core::parse_server_key(key)
        .with_context(|| format!("Invalid server key: {}", key))?;
    println!("{}", identity);
    Ok(())
}

fn cmd_config(mut config: config::Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            tracing::info!(key = %key, "Config updated");
            println!("{} {} = {}", "✓".green(), key, value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None if config::KEYS.contains(&key.as_str()) => println!("(unset)"),
            None => anyhow::bail!("Unknown config key: {}", key),
        },
        ConfigAction::List => {
            for (key, value) in config.list() {
                println!("  {} = {}", key.bright_cyan(), value);
            }
        }
        ConfigAction::Path => {
            println!("{}", config::Config::config_file()?.display());
        }
    }
    Ok(())
}
