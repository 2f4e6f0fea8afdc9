//! Engram CLI entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use std::time::Duration;
use tracing::{info, warn};

use engram::domain::models::{MemoryKind, TriggerKind};
use engram::infrastructure::config::ConfigLoader;
use engram::infrastructure::logging::Logger;
use engram::{build_engine, MemoryError};

#[derive(Parser)]
#[command(name = "engram", about = "Persistent memory engine for LLM sessions", version)]
struct Cli {
    /// Path to a configuration file (defaults to engram.yaml + overrides)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine until interrupted
    Serve,
    /// Show per-kind memory counts
    Stats,
    /// Capture one memory and exit
    Capture {
        /// Origin of the memory (session, tool, user)
        #[arg(long)]
        source: String,
        /// Text payload to capture
        #[arg(long)]
        content: String,
    },
    /// Configuration utilities
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Load and validate the configuration
    Validate,
}

fn load_config(path: Option<&str>) -> Result<engram::domain::models::Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Commands::Config {
        command: ConfigCommands::Validate,
    } = cli.command
    {
        // Loading already validated; reaching here means it passed
        println!("configuration is valid");
        return Ok(());
    }

    let _logger = Logger::init(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Stats => stats(config).await,
        Commands::Capture { source, content } => capture(config, &source, &content).await,
        Commands::Config { .. } => unreachable!("handled above"),
    }
}

async fn serve(config: engram::domain::models::Config) -> Result<()> {
    let engine = build_engine(&config).await?;
    engine.processor.start().await?;

    // Fold forward whatever survived the previous session
    let init_event = engine.processor.event(TriggerKind::ContextInit).await;
    if let Err(e) = engine.processor.trigger(init_event).await {
        warn!(error = %e, "could not enqueue context-init consolidation");
    }

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.journal.consolidation_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // first tick fires immediately

    info!("engram serving; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                if let Err(e) = periodic_check(&engine, &config).await {
                    warn!(error = %e, "periodic consolidation check failed");
                }
            }
        }
    }

    info!("shutting down: flushing memories");
    let end_event = engine.processor.event(TriggerKind::ConversationEnd).await;
    // The final flush matters; retry a full queue a few times
    for _ in 0..5 {
        match engine.processor.trigger(end_event.clone()).await {
            Ok(()) => break,
            Err(MemoryError::QueueFull) => tokio::time::sleep(Duration::from_millis(200)).await,
            Err(e) => {
                warn!(error = %e, "could not enqueue final consolidation");
                break;
            }
        }
    }

    engine.processor.stop().await;
    engine.journal.shutdown();
    Ok(())
}

/// Emit a threshold trigger when any configured limit has been crossed.
async fn periodic_check(
    engine: &engram::Engine,
    config: &engram::domain::models::Config,
) -> Result<()> {
    let stats = engine.journal.memory_stats().await?;
    let episodic = stats.count_for(MemoryKind::Episodic);
    // Embedding payload estimate: four bytes per dimension per entry
    let embedding_bytes = stats.total * config.vector_store.vector_dimension as u64 * 4;

    if let Some(threshold) = engine
        .processor
        .exceeded_threshold(episodic, embedding_bytes)
        .await
    {
        info!(?threshold, episodic, "threshold crossed, scheduling consolidation");
        let event = engine.processor.event(TriggerKind::ThresholdReached).await;
        match engine.processor.trigger(event).await {
            Ok(()) | Err(MemoryError::QueueFull) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn stats(config: engram::domain::models::Config) -> Result<()> {
    let engine = build_engine(&config).await?;
    let stats = engine.journal.memory_stats().await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Kind", "Count"]);
    for kind in MemoryKind::all() {
        table.add_row(vec![kind.as_str().to_string(), stats.count_for(kind).to_string()]);
    }
    table.add_row(vec!["total".to_string(), stats.total.to_string()]);
    println!("{table}");
    Ok(())
}

async fn capture(
    config: engram::domain::models::Config,
    source: &str,
    content: &str,
) -> Result<()> {
    let engine = build_engine(&config).await?;
    let entry = engine
        .journal
        .capture(source, content, Default::default())
        .await?;
    println!("captured {} ({} chars embedded)", entry.id, entry.content.len());

    // Give the background association pass a moment before exiting
    tokio::time::sleep(Duration::from_millis(500)).await;
    engine.journal.shutdown();
    Ok(())
}
