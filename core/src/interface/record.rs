use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::prelude::{VolumeError, VolumeResult};

/// Bit depth tag attached to every stored moment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum MomentFormat {
    /// 8-bit unsigned codes, `UV8` in the source files.
    Uv8,
    /// 16-bit unsigned codes. Any tag other than `UV8` lands here.
    Uv16,
}

impl MomentFormat {
    pub fn from_tag(tag: &str) -> Self {
        if tag == "UV8" {
            MomentFormat::Uv8
        } else {
            MomentFormat::Uv16
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            MomentFormat::Uv8 => "UV8",
            MomentFormat::Uv16 => "UV16",
        }
    }

    /// Code span mapped onto the calibration range. The top code is reserved.
    pub fn divisor(self) -> f64 {
        match self {
            MomentFormat::Uv8 => 254.0,
            MomentFormat::Uv16 => 65534.0,
        }
    }
}

impl From<String> for MomentFormat {
    fn from(tag: String) -> Self {
        MomentFormat::from_tag(&tag)
    }
}

impl From<MomentFormat> for String {
    fn from(format: MomentFormat) -> Self {
        format.tag().to_string()
    }
}

/// Per-sweep calibration of one moment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Calibration {
    pub format: MomentFormat,
    pub dyn_range_min: f64,
    pub dyn_range_max: f64,
}

/// Raw samples of one moment in one sweep, shaped (rays, range bins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentData {
    #[serde(flatten)]
    pub calibration: Calibration,
    #[serde(default)]
    pub unit: Option<String>,
    pub samples: Array2<u16>,
}

impl MomentData {
    pub fn shape(&self) -> (usize, usize) {
        self.samples.dim()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RayHeader {
    pub azimuth: f64,
    pub elevation: f64,
}

/// One elevation sweep as delivered by the file reader.
///
/// Scalar attributes are optional here because the reader passes through
/// whatever the file holds; the normalization core decides which of them are
/// required and fails with [`VolumeError::MissingAttribute`] otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub index: usize,
    #[serde(default)]
    pub prf: Option<f64>,
    #[serde(default)]
    pub wavelength: Option<f64>,
    /// Antenna rate in degrees per second.
    #[serde(default)]
    pub scan_speed: Option<f64>,
    /// Gate spacing in meters.
    #[serde(default)]
    pub range_step: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rays: Vec<RayHeader>,
    #[serde(default)]
    pub moments: BTreeMap<String, MomentData>,
}

impl ScanRecord {
    pub fn ray_count(&self) -> usize {
        self.rays.len()
    }

    pub fn require_prf(&self) -> VolumeResult<f64> {
        self.prf.ok_or_else(|| self.missing("prf"))
    }

    pub fn require_wavelength(&self) -> VolumeResult<f64> {
        self.wavelength.ok_or_else(|| self.missing("wavelength"))
    }

    pub fn require_scan_speed(&self) -> VolumeResult<f64> {
        self.scan_speed.ok_or_else(|| self.missing("scan_speed"))
    }

    pub fn require_range_step(&self) -> VolumeResult<f64> {
        self.range_step.ok_or_else(|| self.missing("range_step"))
    }

    pub fn require_timestamp(&self) -> VolumeResult<DateTime<Utc>> {
        self.timestamp.ok_or_else(|| self.missing("timestamp"))
    }

    pub fn require_rays(&self) -> VolumeResult<&[RayHeader]> {
        if self.rays.is_empty() {
            Err(self.missing("ray_header"))
        } else {
            Ok(&self.rays)
        }
    }

    fn missing(&self, name: &'static str) -> VolumeError {
        VolumeError::MissingAttribute {
            sweep: self.index,
            name,
        }
    }
}

/// Pointing geometry of the whole file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum ScanType {
    #[default]
    Pointing,
    Ppi,
    Rhi,
}

impl ScanType {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ppi" => ScanType::Ppi,
            "rhi" => ScanType::Rhi,
            // Neither PPI nor RHI: the instrument was staring.
            _ => ScanType::Pointing,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ScanType::Pointing => "pointing",
            ScanType::Ppi => "ppi",
            ScanType::Rhi => "rhi",
        }
    }
}

impl From<String> for ScanType {
    fn from(tag: String) -> Self {
        ScanType::from_tag(&tag)
    }
}

impl From<ScanType> for String {
    fn from(scan_type: ScanType) -> Self {
        scan_type.tag().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteAttributes {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    #[serde(default)]
    pub scan_type: ScanType,
}
