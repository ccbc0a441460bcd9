use anyhow::{Context, Result};
use clap::Parser;
use logtrim::Pipeline;
use logtrim::preferences::Preferences;
use logtrim::tool::ToolRequest;
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

/// Reads one JSON tool request on stdin and prints the JSON result.
#[derive(Parser)]
#[command(name = "logtrim", version)]
struct Cli {
    /// Preferences file (defaults to ./logtrim.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn run(cli: &Cli) -> Result<String> {
    let prefs = match &cli.config {
        Some(path) => Preferences::load(path)?,
        None => Preferences::load_from_dir(&env::current_dir().context("reading cwd")?)?,
    };
    let input = read_stdin().context("reading stdin")?;
    let request: ToolRequest =
        serde_json::from_str(&input).context("parsing tool request")?;

    let output = request.execute(&Pipeline::new(prefs))?;
    serde_json::to_string(&output).context("serializing output")
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("logtrim: {err:#}");
            process::exit(2);
        }
    }
}
