//! Database bootstrap for the tgpipe stages
//!
//! One SQLite store per layer: the main database holds the upstream fact
//! tables, `raw.db` holds the raw load target, and `enriched.db` holds the
//! derived facts. The layer stores are attached under the schema names
//! `raw` and `enriched`, so stage SQL addresses `raw.telegram_messages` and
//! `enriched.image_detections` directly.

use crate::{PipelineConfig, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Open the store for one stage run.
///
/// The stages are sequential batch jobs that process one item at a time, so
/// the pool is capped at a single connection. The layer databases are
/// attached on connect; files are created on first use (`mode=rwc`).
pub async fn init_pool(config: &PipelineConfig) -> Result<SqlitePool> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let attach_raw = format!(
        "ATTACH DATABASE '{}' AS raw",
        config.raw_layer_path().display()
    );
    let attach_enriched = format!(
        "ATTACH DATABASE '{}' AS enriched",
        config.enriched_layer_path().display()
    );

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .after_connect(move |conn, _meta| {
            let attach_raw = attach_raw.clone();
            let attach_enriched = attach_enriched.clone();
            Box::pin(async move {
                sqlx::query(&attach_raw).execute(&mut *conn).await?;
                sqlx::query(&attach_enriched).execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&db_url)
        .await?;

    Ok(pool)
}
