//! Object detector collaborator
//!
//! The detection model runs behind a command-line contract: the configured
//! command is invoked once per image with the image path as its argument
//! and prints a JSON array of detections on stdout. The class-index-to-
//! label mapping comes from a names file, one label per line, index equal
//! to line number.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Detector errors
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Detection command not found in PATH
    #[error("Detection command not found: {0}")]
    CommandNotFound(String),

    /// Failed to execute the detection command
    #[error("Failed to execute detector: {0}")]
    ExecutionError(String),

    /// Detector exited with an error
    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    /// Failed to parse detector JSON output
    #[error("Failed to parse detector output: {0}")]
    ParseError(String),

    /// Bounding box is not four coordinates
    #[error("Malformed bounding box: {0}")]
    MalformedBox(String),

    /// Names file missing or unreadable
    #[error("Class names unavailable: {0}")]
    NamesUnavailable(String),
}

/// Axis-aligned box in the image's pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

/// One detected object instance within one image
#[derive(Debug, Clone)]
pub struct Detection {
    pub class_index: usize,
    /// Confidence score in [0, 1]
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// External detection collaborator consumed by the Enrichment Engine.
///
/// Stateless for the duration of a run: one instance is constructed up
/// front and reused across all images.
pub trait Detector {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, DetectorError>;

    /// Class-index-to-label mapping exposed alongside the detector
    fn class_name(&self, class_index: usize) -> Option<&str>;
}

/// Detector output line shape
#[derive(Debug, Deserialize)]
struct WireDetection {
    class_index: usize,
    confidence: f32,
    bbox: Vec<f32>,
}

/// Command-line detector wrapper
pub struct YoloCommandDetector {
    command: String,
    names: Vec<String>,
    min_confidence: f32,
}

impl YoloCommandDetector {
    /// Build the detector from configuration. The names file is required:
    /// without it no class index can be resolved to a label.
    pub fn new(config: &tgpipe_common::config::DetectorConfig) -> Result<Self, DetectorError> {
        let names_file = config.names_file.as_ref().ok_or_else(|| {
            DetectorError::NamesUnavailable(
                "no names file configured (detector.names_file)".to_string(),
            )
        })?;
        let names = load_names(names_file)?;

        Ok(Self {
            command: config.command.clone(),
            names,
            min_confidence: config.min_confidence,
        })
    }

    fn parse_output(&self, stdout: &[u8]) -> Result<Vec<Detection>, DetectorError> {
        let wire: Vec<WireDetection> =
            serde_json::from_slice(stdout).map_err(|e| DetectorError::ParseError(e.to_string()))?;

        let mut detections = Vec::with_capacity(wire.len());
        for w in wire {
            if w.confidence < self.min_confidence {
                continue;
            }
            let &[x_min, y_min, x_max, y_max] = w.bbox.as_slice() else {
                return Err(DetectorError::MalformedBox(format!(
                    "expected 4 coordinates, got {}",
                    w.bbox.len()
                )));
            };
            detections.push(Detection {
                class_index: w.class_index,
                confidence: w.confidence,
                bbox: BoundingBox {
                    x_min,
                    y_min,
                    x_max,
                    y_max,
                },
            });
        }
        Ok(detections)
    }
}

impl Detector for YoloCommandDetector {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, DetectorError> {
        let output = Command::new(&self.command)
            .arg(image)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    DetectorError::CommandNotFound(self.command.clone())
                }
                _ => DetectorError::ExecutionError(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectorError::DetectionFailed(stderr.trim().to_string()));
        }

        self.parse_output(&output.stdout)
    }

    fn class_name(&self, class_index: usize) -> Option<&str> {
        self.names.get(class_index).map(String::as_str)
    }
}

fn load_names(path: &PathBuf) -> Result<Vec<String>, DetectorError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DetectorError::NamesUnavailable(format!("{}: {}", path.display(), e))
    })?;
    Ok(content
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}
