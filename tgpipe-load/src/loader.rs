//! Raw Loader stage
//!
//! Full-replace bulk load of acquired JSON batch files into the raw store.
//! Failure isolation is per file: a file that cannot be read, parsed, or
//! inserted is skipped with a diagnostic and the load continues. Rows are
//! inserted inside one transaction per file, so a failed file leaves no
//! rows behind. No insertion is ever retried.

use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Why one file was skipped; never aborts the load
#[derive(Debug, Error)]
enum FileLoadError {
    #[error("unreadable: {0}")]
    Read(#[from] std::io::Error),

    #[error("not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("top-level value is not an array")]
    NotAnArray,

    #[error("insert failed: {0}")]
    Insert(#[from] sqlx::Error),
}

/// Outcome of one load run
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub rows_inserted: u64,
}

/// Raw Loader: batch files in, raw store snapshot out
pub struct RawLoader {
    pool: SqlitePool,
    messages_root: PathBuf,
}

impl RawLoader {
    pub fn new(pool: SqlitePool, messages_root: PathBuf) -> Self {
        Self {
            pool,
            messages_root,
        }
    }

    /// Run one full-replace load.
    ///
    /// The raw table is cleared (and its id sequence reset) before any file
    /// is read; with zero discovered files the cleared table simply stays
    /// empty.
    pub async fn run(&self) -> tgpipe_common::Result<LoadReport> {
        ensure_raw_table(&self.pool).await?;
        self.clear_raw_table().await?;

        let files = self.discover_files();
        let mut report = LoadReport {
            files_found: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            info!(
                root = %self.messages_root.display(),
                "No JSON files found under messages root"
            );
            return Ok(report);
        }

        info!(files = files.len(), "Loading batch files into raw store");

        for path in &files {
            let relative = path
                .strip_prefix(&self.messages_root)
                .unwrap_or(path)
                .to_string_lossy()
                .to_string();

            match self.load_file(path, &relative).await {
                Ok(rows) => {
                    report.files_loaded += 1;
                    report.rows_inserted += rows;
                    info!(file = %relative, rows, "Loaded batch file");
                }
                Err(e) => {
                    report.files_skipped += 1;
                    warn!(file = %relative, error = %e, "Skipping batch file");
                }
            }
        }

        info!(
            files_loaded = report.files_loaded,
            files_skipped = report.files_skipped,
            rows = report.rows_inserted,
            "Raw load complete"
        );

        Ok(report)
    }

    /// Every *.json file under the messages root, recursively, in a stable
    /// order. Unreadable directory entries are logged and skipped.
    fn discover_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.messages_root).follow_links(false) {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && path
                            .extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
                    {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                }
            }
        }
        files.sort();
        files
    }

    /// Insert one file's array elements, one row each, in one transaction.
    /// Any failure rolls the whole file back.
    async fn load_file(&self, path: &Path, relative: &str) -> Result<u64, FileLoadError> {
        let content = std::fs::read_to_string(path)?;
        let document: serde_json::Value = serde_json::from_str(&content)?;
        let messages = document.as_array().ok_or(FileLoadError::NotAnArray)?;

        let loaded_at = Utc::now();
        let mut tx = self.pool.begin().await?;
        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO raw.telegram_messages (message_data, source_file, loaded_at)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(message.to_string())
            .bind(relative)
            .bind(loaded_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(messages.len() as u64)
    }

    /// Full-replace semantics: drop all rows and restart the id sequence, so
    /// every load repopulates from the same base.
    async fn clear_raw_table(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM raw.telegram_messages")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM raw.sqlite_sequence WHERE name = 'telegram_messages'")
            .execute(&self.pool)
            .await?;
        info!("Raw store cleared");
        Ok(())
    }
}

/// Create the raw table if absent
async fn ensure_raw_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw.telegram_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_data TEXT NOT NULL,
            source_file TEXT NOT NULL,
            loaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
