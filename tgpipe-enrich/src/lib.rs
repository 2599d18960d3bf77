//! tgpipe-enrich - Enrichment Engine stage
//!
//! Reads upstream fact rows that reference an image, runs each image
//! through the detector, and appends one structured fact row per detected
//! object to `enriched.image_detections`. The unit of work is one image:
//! its detections commit together, and a failure rolls back only that
//! image's in-flight rows — one bad image never halts the run.

pub mod detector;
pub mod engine;

pub use detector::{BoundingBox, Detection, Detector, DetectorError, YoloCommandDetector};
pub use engine::{EnrichReport, EnrichmentEngine};
