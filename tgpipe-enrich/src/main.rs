//! tgpipe-enrich — Enrichment Engine batch entry point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tgpipe_common::config::{ConfigOverrides, PipelineConfig, RerunPolicy};
use tgpipe_enrich::{EnrichmentEngine, YoloCommandDetector};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tgpipe-enrich",
    about = "Run object detection over referenced images and persist detection facts"
)]
struct Cli {
    /// Pipeline data root directory
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// What a re-run does to prior facts: replace (default) or append
    #[arg(long)]
    rerun: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting tgpipe-enrich (Enrichment Engine) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let rerun = cli
        .rerun
        .map(|s| s.parse::<RerunPolicy>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let config = PipelineConfig::load(ConfigOverrides {
        config_file: cli.config,
        data_root: cli.data_root,
        rerun,
        ..Default::default()
    })?;

    // Detector misconfiguration is fatal before any row is touched
    let detector = YoloCommandDetector::new(&config.detector)?;
    info!(command = %config.detector.command, "Detector ready");

    let pool = tgpipe_common::db::init_pool(&config).await?;
    let engine = EnrichmentEngine::new(pool.clone(), detector, config.media_root(), config.rerun);
    let result = engine.run().await;
    pool.close().await;

    let report = result?;
    info!(
        rows = report.rows_seen,
        processed = report.images_processed,
        skipped = report.images_skipped,
        failed = report.images_failed,
        detections = report.detections_inserted,
        "Enrichment complete"
    );

    Ok(())
}
