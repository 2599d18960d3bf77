//! Source Acquirer stage
//!
//! Resolves the channel, drains the message window, and writes the whole
//! batch as one JSON array file. Nothing touches disk until the window is
//! fully fetched, so a failed run leaves no partial output and a re-run
//! simply overwrites the previous batch for that channel and day.

use crate::channel::ChannelRef;
use crate::client::{ChannelClient, ClientError};
use crate::records::RawMessageRecord;
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Acquirer stage errors; all of these abort the run
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one acquisition run
#[derive(Debug, Clone)]
pub struct AcquireReport {
    pub channel_id: i64,
    pub channel_title: String,
    pub messages: usize,
    pub output_path: PathBuf,
}

/// Source Acquirer: channel window in, one batch file out
pub struct Acquirer<C> {
    client: C,
    messages_root: PathBuf,
}

impl<C: ChannelClient> Acquirer<C> {
    pub fn new(client: C, messages_root: PathBuf) -> Self {
        Self {
            client,
            messages_root,
        }
    }

    /// Fetch up to `limit` messages, most recent first, and write the batch
    /// to `<messages_root>/<YYYY-MM-DD>/<handle-or-id>.json`.
    pub async fn run(
        &self,
        reference: &ChannelRef,
        limit: usize,
    ) -> Result<AcquireReport, AcquireError> {
        let peer = self.client.resolve(reference).await?;
        info!(
            channel = %peer.title,
            id = peer.id,
            limit,
            "Scraping channel messages"
        );

        let mut records = Vec::new();
        {
            let mut stream = self.client.iter_messages(&peer, limit);
            while let Some(message) = stream.next().await {
                let message = message?;
                records.push(RawMessageRecord::from_wire(&message, &peer));
            }
        }

        let day = Utc::now().format("%Y-%m-%d").to_string();
        let output_dir = self.messages_root.join(&day);
        std::fs::create_dir_all(&output_dir)?;

        let output_path = output_dir.join(format!("{}.json", peer.file_stem()));
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&output_path, json)?;

        info!(
            messages = records.len(),
            output = %output_path.display(),
            "Batch written"
        );

        Ok(AcquireReport {
            channel_id: peer.id,
            channel_title: peer.title,
            messages: records.len(),
            output_path,
        })
    }
}
