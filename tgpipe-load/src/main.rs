//! tgpipe-load — Raw Loader batch entry point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tgpipe_common::config::{ConfigOverrides, PipelineConfig};
use tgpipe_load::RawLoader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tgpipe-load",
    about = "Bulk-load acquired JSON batch files into the raw store"
)]
struct Cli {
    /// Pipeline data root directory
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,
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
        "Starting tgpipe-load (Raw Loader) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let config = PipelineConfig::load(ConfigOverrides {
        config_file: cli.config,
        data_root: cli.data_root,
        ..Default::default()
    })?;

    let pool = tgpipe_common::db::init_pool(&config).await?;
    let loader = RawLoader::new(pool.clone(), config.messages_root());
    let result = loader.run().await;
    pool.close().await;

    let report = result?;
    info!(
        files_found = report.files_found,
        files_loaded = report.files_loaded,
        files_skipped = report.files_skipped,
        rows = report.rows_inserted,
        "Load complete"
    );

    Ok(())
}
