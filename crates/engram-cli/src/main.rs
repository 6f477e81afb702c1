use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use engram::config::Config;
use engram_cli::commands::{
    ConsolidateCommand, EntityCommand, MemoryCommand, StatsCommand, TimelineCommand,
};
use engram_cli::error::CliResult;
use engram_cli::host;
use engram_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "engram-cli")]
#[command(about = "Engram CLI - Management tool for engram memory stores")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to data directory")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Long-term memory commands")]
    Memory(MemoryCommand),

    #[clap(about = "Show memory statistics")]
    Stats(StatsCommand),

    #[clap(about = "Show memories bucketed by day")]
    Timeline(TimelineCommand),

    #[clap(about = "Summarize memories around one entity")]
    Entity(EntityCommand),

    #[clap(about = "Run a consolidation pass")]
    Consolidate(ConsolidateCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    init_logging();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let config = Config::load(cli.config.as_deref())?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.data_dir());

    let mut curator = host::open_curator(&data_dir).await?;

    match &cli.command {
        Command::Memory(cmd) => cmd.execute(&mut curator, format).await?,
        Command::Stats(cmd) => cmd.execute(&curator, format).await?,
        Command::Timeline(cmd) => cmd.execute(&curator, format).await?,
        Command::Entity(cmd) => cmd.execute(&curator, format).await?,
        Command::Consolidate(cmd) => cmd.execute(&mut curator, format).await?,
    }

    // Writes only mark the store dirty; the snapshot lands here.
    curator.flush().await?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
