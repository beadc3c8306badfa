//! `mrf-extract`: stream an MRF index and write the matching in-network
//! file URLs as a JSON array

mod input;
mod progress_bar;

use clap::Parser;
use input::{CompressionMode, Input, parse_region_pair};
use mrf_core::{
    Error, FileSource, HttpSource, Pipeline, PipelineConfig, PipelineReport, ProgressReporter,
    Result, TracingReporter,
};
use mrf_domain::{PathSelector, PlanRegionPolicy, PolicyConfig};
use progress_bar::ConsoleProgress;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mrf-extract", version)]
#[command(about = "Extract in-network file URLs for one region from an MRF index")]
struct Cli {
    /// Local path or http(s) URL of the index (defaults to the 2024-01-01
    /// Anthem index, local copy first)
    #[arg(long)]
    input: Option<String>,

    /// Output file for the JSON array
    #[arg(long, default_value = "output.json")]
    output: PathBuf,

    /// Dot-separated path of the array whose elements are records
    #[arg(long, default_value = "reporting_structure.*")]
    path_selector: String,

    /// Region abbreviation (NY) or numeric URL code (254)
    #[arg(long, default_value = "NY")]
    region_code: String,

    /// Substring a plan name must contain
    #[arg(long, default_value = " PPO ")]
    plan_token: String,

    /// Extra region mapping, ABBR=CODE (repeatable)
    #[arg(long = "region-map", value_name = "ABBR=CODE", value_parser = parse_region_pair)]
    region_map: Vec<(String, u32)>,

    /// Input framing
    #[arg(long, value_enum, default_value_t = CompressionMode::Auto)]
    compression: CompressionMode,

    /// Bytes per source read
    #[arg(long, default_value_t = PipelineConfig::default().chunk_size)]
    chunk_size: usize,

    /// Buffered items between adjacent stages
    #[arg(long, default_value_t = PipelineConfig::default().channel_capacity)]
    channel_capacity: usize,

    /// Largest record that may be buffered, in bytes
    #[arg(long, default_value_t = PipelineConfig::default().max_element_bytes)]
    max_element_bytes: usize,

    /// Log progress instead of drawing a bar
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(report) => {
            println!(
                "Total run time in seconds: {:.2}",
                report.elapsed.as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(stage = err.stage(), "{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<PipelineReport> {
    let config = PipelineConfig {
        chunk_size: cli.chunk_size,
        channel_capacity: cli.channel_capacity,
        max_element_bytes: cli.max_element_bytes,
        ..PipelineConfig::default()
    };
    config.validate()?;

    let policy = PlanRegionPolicy::from_config(&PolicyConfig {
        plan_token: cli.plan_token,
        region: cli.region_code,
        region_overrides: cli.region_map.into_iter().collect(),
    })?;
    let selector: PathSelector = cli.path_selector.parse()?;

    let input = match cli.input.as_deref() {
        Some(value) => Input::parse(value),
        None => Input::default_in(Path::new(".")),
    };
    let compression = cli.compression.resolve(&input);
    info!(
        %input,
        output = %cli.output.display(),
        %selector,
        region = %policy.region(),
        ?compression,
        "extracting in-network file URLs"
    );

    let reporter: Arc<dyn ProgressReporter> = if cli.no_progress {
        Arc::new(TracingReporter::default())
    } else {
        Arc::new(ConsoleProgress::new())
    };
    let pipeline = Pipeline::new(selector, Arc::new(policy))
        .with_config(config)
        .with_compression(compression)
        .with_reporter(reporter);
    let chunk_size = pipeline.config().chunk_size;

    match input {
        Input::Path(path) => {
            let source = FileSource::open(&path, chunk_size).await?;
            let sink = create_output(&cli.output).await?;
            pipeline.run(source, sink).await
        }
        Input::Url(url) => {
            let source = HttpSource::fetch(url.as_str()).await?;
            let sink = create_output(&cli.output).await?;
            pipeline.run(source, sink).await
        }
    }
}

async fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .await
        .map_err(|e| Error::sink(format!("cannot create {}: {e}", path.display())))?;
    Ok(BufWriter::new(file))
}
