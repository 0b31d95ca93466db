use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "campus", version, about = "Campus school administration backend")]
struct Cli {
    /// Path to campus.yaml. Defaults to ./campus.yaml when present.
    #[arg(long, short = 'c', global = true, env = "CAMPUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the admin action endpoints until Ctrl-C.
    Serve {
        /// Keep accounts and records in memory instead of Postgres and the
        /// hosted directory.
        #[arg(long, default_value_t = false)]
        in_memory: bool,
    },

    /// Apply pending Postgres migrations.
    Migrate,

    /// Parse and validate the configuration, then print a summary.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd {
        Command::Serve { in_memory } => commands::serve::run(config, in_memory).await?,
        Command::Migrate => commands::migrate::run(&config).await?,
        Command::Check => commands::check::run(&config),
    }

    Ok(())
}
