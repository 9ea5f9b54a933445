use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod envelope;
mod scheme;

#[derive(Parser)]
#[command(name = "meter-ingest")]
#[command(
    about = "Streams Powerclub half-hourly usage and prices as XML events",
    long_about = None
)]
struct Cli {
    /// Print the input scheme and exit
    #[arg(long, conflicts_with = "validate_arguments")]
    scheme: bool,

    /// Validate the configuration from stdin (or --config) and exit
    #[arg(long)]
    validate_arguments: bool,

    /// Config file path; when absent the control envelope is read from stdin
    #[arg(short, long, env = "METER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.scheme {
        println!("{}", scheme::SCHEME);
        return Ok(());
    }

    // stdout carries the event stream, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = commands::resolve_config(cli.config.as_deref())?;

    if cli.validate_arguments {
        commands::run_validate(&config);
        return Ok(());
    }

    commands::run_collect(config, std::io::stdout()).await?;
    Ok(())
}
