//! tgpipe-acquire — Source Acquirer batch entry point

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tgpipe_acquire::{Acquirer, ChannelRef, GatewayClient};
use tgpipe_common::config::{ConfigOverrides, PipelineConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tgpipe-acquire",
    about = "Fetch a window of channel messages into the raw file layer"
)]
struct Cli {
    /// Channel username, or numeric id in the -100-prefixed form
    #[arg(long)]
    channel: Option<String>,

    /// Maximum number of messages to fetch (most recent first)
    #[arg(long)]
    limit: Option<usize>,

    /// Pipeline data root directory
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Channel gateway base URL
    #[arg(long)]
    gateway_url: Option<String>,
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
        "Starting tgpipe-acquire (Source Acquirer) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let config = PipelineConfig::load(ConfigOverrides {
        config_file: cli.config,
        data_root: cli.data_root,
        channel: cli.channel,
        message_limit: cli.limit,
        gateway_url: cli.gateway_url,
        rerun: None,
    })?;

    let channel = config.telegram.channel.clone().ok_or_else(|| {
        anyhow::anyhow!("no channel configured (use --channel or TGPIPE_CHANNEL)")
    })?;
    let reference = ChannelRef::parse(&channel);

    let client = GatewayClient::new(&config.telegram)?;
    let acquirer = Acquirer::new(client, config.messages_root());
    let report = acquirer
        .run(&reference, config.telegram.message_limit)
        .await?;

    info!(
        channel = %report.channel_title,
        channel_id = report.channel_id,
        messages = report.messages,
        output = %report.output_path.display(),
        "Acquisition complete"
    );

    Ok(())
}
