use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use modbench::bench::Benchmark;
use modbench::config::{BenchConfig, DEFAULT_IMAGE_URLS};

mod logging;

use logging::setup_logging;

#[derive(Parser)]
#[command(name = "modbench", about = "Latency benchmark for cloud image moderation services", long_about = None)]
struct Cli {
    /// Image URL to benchmark against (repeatable, defaults to the built-in
    /// image set)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// AWS region for the Rekognition client (overrides AWS_REGION)
    #[arg(long, value_name = "REGION")]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut config = BenchConfig::from_env().context("failed to load benchmark configuration")?;
    if let Some(region) = cli.region {
        config.aws_region = region;
    }

    let urls: Vec<String> = if cli.urls.is_empty() {
        DEFAULT_IMAGE_URLS.iter().map(|url| url.to_string()).collect()
    } else {
        cli.urls
    };

    tracing::debug!(region = %config.aws_region, urls = urls.len(), "starting benchmark");

    let benchmark = match Benchmark::from_config(&config).await {
        Ok(benchmark) => benchmark,
        Err(err) => {
            eprintln!("{} failed to create client: {err}", style("error:").red().bold());
            return Err(err.into());
        }
    };

    let stdout = std::io::stdout();
    benchmark
        .run(&urls, &mut stdout.lock())
        .await
        .context("failed to write benchmark report")?;

    Ok(())
}
