//! Trader Watch — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use trader_watch_cli::commands;
use trader_watch_cli::config::{CliOverrides, WatchConfig};

#[derive(Parser)]
#[command(
    name = "trader-watch",
    about = "Trader Watch — collect recent copy-trading orders and post them to Telegram",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Visit every trader page and report in-window orders (default).
    Scan {
        /// File with one trader id per line.
        #[arg(long)]
        ids: Option<PathBuf>,

        /// Keep only orders whose first line contains this symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// How many hours back to look.
        #[arg(long)]
        hours: Option<f64>,

        /// Show the browser window.
        #[arg(long)]
        headed: bool,

        /// Do not send a screenshot per trader.
        #[arg(long)]
        no_snapshots: bool,

        /// Directory for the run report.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Collect trader ids from the copy-trading listing.
    Discover {
        /// Where to write the ids (defaults to the configured ids file).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Maximum number of listing pages to read.
        #[arg(long)]
        max_pages: Option<usize>,

        /// Show the browser window.
        #[arg(long)]
        headed: bool,
    },

    /// Convert a file of trader profile links into an id file.
    ExtractIds {
        /// File with one link per line.
        links: PathBuf,

        /// Where to write the ids (defaults to the configured ids file).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Scan {
        ids: None,
        symbol: None,
        hours: None,
        headed: false,
        no_snapshots: false,
        output_dir: None,
    });

    match command {
        Commands::Scan {
            ids,
            symbol,
            hours,
            headed,
            no_snapshots,
            output_dir,
        } => {
            let mut config = WatchConfig::load(cli.config.as_deref())?;
            config.apply_overrides(CliOverrides {
                ids_file: ids,
                output_dir,
                symbol,
                hours,
                headed,
                no_snapshots,
                ..CliOverrides::default()
            });

            let result = commands::scan(&config).await?;
            println!("{}", result.summary());
        }

        Commands::Discover {
            out,
            max_pages,
            headed,
        } => {
            let mut config = WatchConfig::load(cli.config.as_deref())?;
            config.apply_overrides(CliOverrides {
                max_listing_pages: max_pages,
                headed,
                ..CliOverrides::default()
            });
            let out = out.unwrap_or_else(|| config.ids_file.clone());
            let ids = commands::discover(&config, &out).await?;
            println!("Found {} trader id(s), saved to {}", ids.len(), out.display());
        }

        Commands::ExtractIds { links, out } => {
            let config = WatchConfig::load(cli.config.as_deref())?;
            let out = out.unwrap_or_else(|| config.ids_file.clone());
            let ids = commands::extract_ids(&links, &out)?;
            println!("Found {} id(s). Saved to {}", ids.len(), out.display());
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "trader-watch", &mut std::io::stdout());
        }
    }

    Ok(())
}
