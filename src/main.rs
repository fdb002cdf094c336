use anyhow::Result;
use clap::{Parser, Subcommand};

use openkanban::app;
use openkanban::config::Config;
use openkanban::logging;

#[derive(Parser)]
#[command(name = "openkanban", version, about = "Kanban dashboard for AI coding agents")]
struct Cli {
    /// Path to an explicit config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and exit
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load the configuration, run validation, and report the result
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config {
            action: ConfigAction::Validate,
        }) => {
            let config = Config::load(cli.config.as_deref());
            match config {
                Ok(config) => {
                    let _ = logging::init_logging(&config, false, cli.debug);
                    println!(
                        "Configuration OK: {} agent(s), default '{}'",
                        config.agents.map.len(),
                        config.agents.default_agent
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Configuration invalid: {e:#}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            // Invalid configuration refuses to start the dashboard
            let config = Config::load(cli.config.as_deref())?;
            let logging_handle = logging::init_logging(&config, true, cli.debug)?;
            if let Some(path) = &logging_handle.log_file_path {
                tracing::info!(path = %path.display(), "Logging to file");
            }
            app::run(config).await
        }
    }
}
