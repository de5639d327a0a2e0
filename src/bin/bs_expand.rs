use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use beatsaver_harvester::expand::expand_tree;

#[derive(Parser)]
#[command(name = "bs-expand")]
#[command(about = "Expand downloaded map archives in place")]
#[command(version, author)]
struct Cli {
    /// Directory holding the per-map download tree
    #[arg(short = 'i', long = "input-dir", default_value = "data/raw_maps")]
    input_dir: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let summary = expand_tree(&cli.input_dir).into_diagnostic()?;

    println!(
        "Finished expanding archives: {} extracted, {} failed.",
        summary.extracted, summary.failed
    );
    Ok(())
}
