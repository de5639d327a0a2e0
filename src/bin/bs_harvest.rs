use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use beatsaver_harvester::config::{DEFAULT_ENDPOINT, HarvesterConfig};
use beatsaver_harvester::error::HarvestError;
use beatsaver_harvester::feed::BeatSaverClient;
use beatsaver_harvester::harvester::{Harvester, LogSink};
use beatsaver_harvester::store::FsMapStore;

#[derive(Parser)]
#[command(name = "bs-harvest")]
#[command(about = "Download the latest maps and their metadata from the BeatSaver API")]
#[command(version, author)]
struct Cli {
    /// Number of maps to download; unbounded when omitted
    #[arg(short = 'n', long = "n_maps")]
    n_maps: Option<u64>,

    /// Directory to download the maps to
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Utf8PathBuf,

    /// Download maps published before this timestamp (default: now)
    #[arg(short = 'b', long = "before-param")]
    before_param: Option<String>,

    /// Base URL of the feed API
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Pause between page requests, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(harvest) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(harvest));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::FeedHttp(_)
        | HarvestError::FeedStatus { .. }
        | HarvestError::PayloadHttp(_)
        | HarvestError::PayloadStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = HarvesterConfig::new(cli.output_dir);
    config.endpoint = cli.endpoint;
    config.n_maps = cli.n_maps;
    config.delay = Duration::from_millis(cli.delay_ms);
    if let Some(before) = cli.before_param {
        config.before = before;
    }

    let store = FsMapStore::new(config.output_dir.clone());
    store.ensure_root().into_diagnostic()?;
    let client = BeatSaverClient::new(config.endpoint.as_str()).into_diagnostic()?;

    let sink = LogSink;
    let mut harvester = Harvester::new(config, client, store, &sink).into_diagnostic()?;
    let count = harvester.download_latest(&sink).into_diagnostic()?;

    println!("Finished scraping maps. A total of {count} maps were downloaded.");
    Ok(())
}
