use anyhow::Result;
use tracing::error;

mod cli;
mod logging;
mod monitor;
mod progress;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let level = logging::level_for(cli.verbose, cli.quiet);
    logging::init(level, &cli.log_file)?;

    let quiet = cli.quiet;
    let result = match cli.into_command() {
        Commands::Run(mut args) => {
            args.no_progress |= quiet;
            monitor::run(args).await
        }
        Commands::Products { config } => monitor::list_products(&config),
    };

    if let Err(e) = &result {
        error!("Run failed: {:#}", e);
    }
    result
}
