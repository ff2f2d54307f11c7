//! Althold - altitude-hold controller simulator

use althold_core::AltHoldConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "althold")]
#[command(about = "Altitude-hold estimator and controller, flown in simulation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fly a scenario or a gain sweep
    Run {
        /// Pass remaining arguments to althold-cli
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the default controller configuration as JSON
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => {
            let cli_args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
            run_cli(&cli_args)
        }
        Commands::Config => print_default_config(),
    }
}

fn run_cli(args: &[&str]) -> anyhow::Result<()> {
    let mut full_args = vec!["althold-cli"];
    full_args.extend(args);

    if let Err(e) = althold_cli::run_cli_main(&full_args) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn print_default_config() -> anyhow::Result<()> {
    let config = AltHoldConfig::default();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
