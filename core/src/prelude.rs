use serde::{Deserialize, Serialize};

use crate::interface::{ScanRecord, SiteAttributes};

/// Raw code written under every masked cell before the mask is applied.
pub const DEFAULT_FILL_VALUE: f64 = -32768.0;

/// How rays are grouped into sweeps for the sweep index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SweepGrouping {
    /// One group per input sweep, using the sweep tag carried on every ray.
    #[default]
    BySweep,
    /// One group per distinct elevation value, compared exactly.
    ByElevation,
}

/// Settings shared by every component of one ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub fill_value: f64,
    /// Caller-supplied duration of the final sweep. Skips the scan-speed
    /// extrapolation when set.
    pub last_sweep_duration_s: Option<f64>,
    pub grouping: SweepGrouping,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            fill_value: DEFAULT_FILL_VALUE,
            last_sweep_duration_s: None,
            grouping: SweepGrouping::BySweep,
        }
    }
}

/// Common error type for volume normalization.
#[derive(thiserror::Error, Debug)]
pub enum VolumeError {
    #[error("source contains no sweeps")]
    NoSweeps,
    #[error("sweep index {index} appears more than once")]
    DuplicateSweep { index: usize },
    #[error("sweep {sweep} is missing required attribute `{name}`")]
    MissingAttribute { sweep: usize, name: &'static str },
    #[error("timing extrapolation needs {required} sweep intervals, only {available} available")]
    InsufficientSweeps { available: usize, required: usize },
    #[error("degenerate scan-speed fit: {reason}")]
    DegenerateFit { reason: String },
    #[error("volume duration {total_seconds}s cannot give {rays} rays increasing timestamps")]
    NonMonotonicTime { total_seconds: f64, rays: usize },
    #[error(
        "sweep {sweep} moment `{moment}` has shape {found:?} after reconciliation, expected {expected:?}"
    )]
    ShapeMismatch {
        sweep: usize,
        moment: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type VolumeResult<T> = Result<T, VolumeError>;

/// Boundary to the collaborator that opens files and reads raw sweep tables.
pub trait ScanSource {
    fn site(&self) -> VolumeResult<SiteAttributes>;
    fn scans(&self) -> VolumeResult<Vec<ScanRecord>>;
}
