use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "map-monitor")]
#[command(author = "CharaTech")]
#[command(version)]
#[command(about = "Detects shopping listings priced below the minimum advertised price", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for a bare invocation, which runs the monitor
    #[command(flatten)]
    pub run: RunArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log file, appended to on every run
    #[arg(long, global = true, default_value = "map_monitor.log")]
    pub log_file: PathBuf,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Configuration document
    #[arg(short, long, env = "MAP_MONITOR_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Where the violation list is saved
    #[arg(short, long, default_value = "violations.json")]
    pub output: PathBuf,

    /// Also write the violations as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Run the browser headless regardless of configuration
    #[arg(long)]
    pub headless: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Crawl every configured product and report MAP violations (default)
    Run(RunArgs),

    /// Validate the configuration and list the product catalog
    Products {
        #[arg(short, long, env = "MAP_MONITOR_CONFIG", default_value = "config.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to execute; a bare invocation runs the monitor.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Run(self.run))
    }
}
