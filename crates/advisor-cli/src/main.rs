//! Investment advisor CLI
//!
//! Prompts for a stock symbol or company name, researches it and writes
//! `Analysis.md` and `Recommendation.md`.
//!
//! # Usage
//!
//! ```bash
//! # Set up environment variables (or put them in .env)
//! export GOOGLE_API_KEY="..."
//!
//! # Run the advisor
//! cargo run --bin advisor -- --output-dir reports
//! ```

use advisor_stock::{AdvisorConfig, Pipeline};
use advisor_utils::{EnvLookup, ProcessEnv};
use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "advisor")]
#[command(about = "AI investment advisor: research a stock and recommend Buy, Hold or Sell", long_about = None)]
struct Args {
    /// JSON configuration file (defaults to ./advisor.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for Analysis.md and Recommendation.md
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Symbol or company name; skips the interactive prompt
    #[arg(short, long)]
    symbol: Option<String>,
}

fn print_banner() {
    println!(
        r#"
╔══════════════════════════════════════════════════════════════╗
║                   AI Investment Advisor                      ║
║                                                              ║
║  Researches a stock, analyses its financial health and       ║
║  recommends Buy, Hold or Sell.                               ║
║                                                              ║
║  Indian companies may be entered by name ("TATA MOTORS").    ║
╚══════════════════════════════════════════════════════════════╝
"#
    );
}

/// Ask once for a symbol; `None` on empty input or EOF
fn prompt_symbol() -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    print!("Enter the stock symbol (e.g., AAPL, RELIANCE.NS): ");
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();
    Ok((!input.is_empty()).then(|| input.to_string()))
}

/// Resolve the configuration and build the pipeline, checking credentials
fn build_pipeline(
    config_path: Option<&Path>,
    output_dir: Option<PathBuf>,
    env: &impl EnvLookup,
) -> anyhow::Result<Pipeline> {
    let mut config =
        AdvisorConfig::load(config_path, env).context("failed to load configuration")?;
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    Ok(Pipeline::from_config(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    advisor_utils::init_tracing();
    advisor_utils::load_dotenv();

    let args = Args::parse();

    print_banner();

    // Credentials are checked before asking for input
    let pipeline = build_pipeline(args.config.as_deref(), args.output_dir, &ProcessEnv)?;

    let symbol = match args.symbol.filter(|s| !s.trim().is_empty()) {
        Some(symbol) => Some(symbol),
        None => prompt_symbol().context("failed to read the stock symbol")?,
    };
    let Some(symbol) = symbol else {
        println!("No stock symbol entered. Exiting.");
        return Ok(());
    };

    let ticker = pipeline.normalize(&symbol)?;
    info!("Starting advisor for {}", ticker);
    println!("\nResearching {ticker}. This can take a minute...\n");

    let report = pipeline
        .run(&symbol)
        .await
        .with_context(|| format!("advisor run for {ticker} failed"))?;

    println!("## Final Recommendation\n");
    println!("{}\n", report.recommendation);
    println!("Analysis written to {}", report.analysis_path.display());
    println!(
        "Recommendation written to {}",
        report.recommendation_path.display()
    );

    Ok(())
}
