mod crawl;
mod sink;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::sink::SaveMode;

#[derive(Debug, Parser)]
#[command(name = "roastery-cli")]
#[command(about = "Crawl Korean specialty coffee roasteries into structured records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl sources and write their records to the output directory.
    Crawl {
        /// Source ids to crawl (space or comma separated), or `all`.
        #[arg(long, num_args = 1.., value_delimiter = ',', default_value = "all")]
        sources: Vec<String>,

        /// How records are grouped into output files.
        #[arg(long, value_enum, default_value_t = SaveMode::Combined)]
        save_mode: SaveMode,

        /// Validate configuration and print the plan without fetching anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// List the configured sources.
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = roastery_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Crawl {
            sources,
            save_mode,
            dry_run,
        }) => crawl::run_crawl(&config, &sources, save_mode, dry_run).await,
        Some(Commands::Sources) => crawl::list_sources(&config),
        None => {
            println!("roastery-cli ready; see `roastery-cli --help`");
            Ok(())
        }
    }
}
