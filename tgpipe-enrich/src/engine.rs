//! Enrichment Engine stage
//!
//! Selects upstream fact rows that reference an image, runs each image
//! through the detector, and persists one fact row per detected object.
//! The unit of work is one image: a transaction opens before an image's
//! detections are inserted, all of them commit together, and a failure
//! while processing that image rolls back only its in-flight rows.

use crate::detector::{Detector, DetectorError};
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use tgpipe_common::config::RerunPolicy;

/// Why one image produced no facts; never aborts the run
#[derive(Debug, Error)]
enum ImageError {
    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("unknown class index {0}")]
    UnknownClass(usize),

    #[error("insert failed: {0}")]
    Insert(#[from] sqlx::Error),
}

/// Outcome of one enrichment run
#[derive(Debug, Clone, Default)]
pub struct EnrichReport {
    pub rows_seen: usize,
    pub images_processed: usize,
    pub images_skipped: usize,
    pub images_failed: usize,
    pub detections_inserted: u64,
}

/// Enrichment Engine: upstream image references in, detection facts out
pub struct EnrichmentEngine<D> {
    pool: SqlitePool,
    detector: D,
    media_root: PathBuf,
    rerun: RerunPolicy,
}

impl<D: Detector> EnrichmentEngine<D> {
    pub fn new(pool: SqlitePool, detector: D, media_root: PathBuf, rerun: RerunPolicy) -> Self {
        Self {
            pool,
            detector,
            media_root,
            rerun,
        }
    }

    pub async fn run(&self) -> tgpipe_common::Result<EnrichReport> {
        ensure_detections_table(&self.pool).await?;

        if self.rerun == RerunPolicy::Replace {
            self.clear_detections().await?;
        }

        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT message_id, image_file_path
            FROM fct_messages
            WHERE has_image = 1 AND image_file_path IS NOT NULL
            ORDER BY message_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        info!(rows = rows.len(), "Found messages with images to process");

        let mut report = EnrichReport::default();
        for (message_id, image_file_path) in rows {
            report.rows_seen += 1;

            let full_path = self.media_root.join(&image_file_path);
            if !full_path.exists() {
                warn!(
                    message_id,
                    image = %full_path.display(),
                    "Image file not found, skipping"
                );
                report.images_skipped += 1;
                continue;
            }
            if !is_image_file(&full_path) {
                warn!(
                    message_id,
                    image = %full_path.display(),
                    "File is not a recognized image format, skipping"
                );
                report.images_skipped += 1;
                continue;
            }

            match self.enrich_image(message_id, &full_path).await {
                Ok(inserted) => {
                    report.images_processed += 1;
                    report.detections_inserted += inserted;
                }
                Err(e) => {
                    warn!(
                        message_id,
                        image = %full_path.display(),
                        error = %e,
                        "Failed to enrich image, continuing"
                    );
                    report.images_failed += 1;
                }
            }
        }

        info!(
            processed = report.images_processed,
            skipped = report.images_skipped,
            failed = report.images_failed,
            detections = report.detections_inserted,
            "Image enrichment complete"
        );

        Ok(report)
    }

    /// One image's unit of work: detect, then insert all of its facts in a
    /// single transaction. Dropping the transaction on any error path rolls
    /// back every in-flight row for this image.
    async fn enrich_image(&self, message_id: i64, image: &Path) -> Result<u64, ImageError> {
        let detections = self.detector.detect(image)?;

        let image_path = image.to_string_lossy().into_owned();
        let mut tx = self.pool.begin().await?;
        let detected_at = Utc::now();
        let mut inserted = 0u64;

        for detection in &detections {
            let label = self
                .detector
                .class_name(detection.class_index)
                .ok_or(ImageError::UnknownClass(detection.class_index))?;

            sqlx::query(
                r#"
                INSERT INTO enriched.image_detections (
                    message_id, image_file_path, detected_object, confidence,
                    bbox_x_min, bbox_y_min, bbox_x_max, bbox_y_max,
                    detection_timestamp
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(message_id)
            .bind(image_path.as_str())
            .bind(label)
            .bind(detection.confidence)
            .bind(detection.bbox.x_min)
            .bind(detection.bbox.y_min)
            .bind(detection.bbox.x_max)
            .bind(detection.bbox.y_max)
            .bind(detected_at)
            .execute(&mut *tx)
            .await?;
            inserted += 1;

            tracing::debug!(
                message_id,
                object = label,
                confidence = detection.confidence,
                "Detected object"
            );
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn clear_detections(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM enriched.image_detections")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM enriched.sqlite_sequence WHERE name = 'image_detections'")
            .execute(&self.pool)
            .await?;
        info!("Cleared prior detection facts (rerun policy: replace)");
        Ok(())
    }
}

/// Magic-byte check; the detector only ever sees real image files
fn is_image_file(path: &Path) -> bool {
    use std::io::Read;

    let mut buffer = [0u8; 512];
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(bytes_read) = file.read(&mut buffer) else {
        return false;
    };
    infer::get(&buffer[..bytes_read])
        .map(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .unwrap_or(false)
}

/// Create the fact table if absent
async fn ensure_detections_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enriched.image_detections (
            detection_id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id INTEGER NOT NULL,
            image_file_path TEXT NOT NULL,
            detected_object TEXT NOT NULL,
            confidence REAL NOT NULL,
            bbox_x_min REAL,
            bbox_y_min REAL,
            bbox_x_max REAL,
            bbox_y_max REAL,
            detection_timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
