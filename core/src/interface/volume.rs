use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::interface::record::{ScanType, SiteAttributes};
use crate::prelude::{VolumeError, VolumeResult};
use crate::processing::sweep_index::SweepIndex;
use crate::telemetry::IngestMetrics;

/// Masked (rays, range bins) matrix of physical values for one moment.
///
/// Masked cells hold the fill value in `values`; read them through
/// [`DecodedField::value`] to get `None` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedField {
    pub values: Array2<f64>,
    pub mask: Array2<bool>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl DecodedField {
    pub fn new(values: Array2<f64>, mask: Array2<bool>) -> VolumeResult<Self> {
        if values.dim() != mask.dim() {
            return Err(VolumeError::InvalidInput(format!(
                "value shape {:?} does not match mask shape {:?}",
                values.dim(),
                mask.dim()
            )));
        }
        Ok(Self {
            values,
            mask,
            unit: None,
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn rays(&self) -> usize {
        self.values.nrows()
    }

    pub fn range_bins(&self) -> usize {
        self.values.ncols()
    }

    pub fn value(&self, ray: usize, bin: usize) -> Option<f64> {
        match self.mask.get((ray, bin)) {
            Some(false) => self.values.get((ray, bin)).copied(),
            _ => None,
        }
    }

    pub fn is_masked(&self, ray: usize, bin: usize) -> bool {
        self.mask.get((ray, bin)).copied().unwrap_or(true)
    }

    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&masked| masked).count()
    }

    /// Stacks `other` below this field along the ray axis.
    pub fn append(&mut self, other: &DecodedField) -> VolumeResult<()> {
        if other.range_bins() != self.range_bins() {
            return Err(VolumeError::InvalidInput(format!(
                "cannot append {} range bins onto {}",
                other.range_bins(),
                self.range_bins()
            )));
        }
        self.values
            .append(Axis(0), other.values.view())
            .map_err(|err| VolumeError::InvalidInput(err.to_string()))?;
        self.mask
            .append(Axis(0), other.mask.view())
            .map_err(|err| VolumeError::InvalidInput(err.to_string()))?;
        Ok(())
    }
}

/// Radial positions of the range bins shared by every ray.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeGates {
    /// Distance in meters of each bin.
    pub distances: Array1<f64>,
    pub meters_to_center_of_first_gate: f64,
    pub meters_between_gates: f64,
}

/// Scan strategy label attached to each sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    ManualPpi,
    ManualRhi,
    Pointing,
}

impl SweepMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SweepMode::ManualPpi => "manual_ppi",
            SweepMode::ManualRhi => "manual_rhi",
            SweepMode::Pointing => "pointing",
        }
    }
}

impl From<ScanType> for SweepMode {
    fn from(scan_type: ScanType) -> Self {
        match scan_type {
            ScanType::Ppi => SweepMode::ManualPpi,
            ScanType::Rhi => SweepMode::ManualRhi,
            ScanType::Pointing => SweepMode::Pointing,
        }
    }
}

/// Normalized ray-major volume.
///
/// Every per-ray array has the same length, and every field has as many
/// columns as `range.distances`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtoVolume {
    pub azimuth: Array1<f64>,
    pub elevation: Array1<f64>,
    /// Ordinal of the input sweep each ray came from.
    pub sweep_of_ray: Array1<usize>,
    pub time: Vec<DateTime<Utc>>,
    /// Seconds since `time[0]`, the form written into `time_units`.
    pub time_offsets: Array1<f64>,
    pub unambiguous_range: Array1<f64>,
    pub nyquist_velocity: Array1<f64>,
    pub range: RangeGates,
    pub fields: BTreeMap<String, DecodedField>,
    pub sweep_index: SweepIndex,
    pub sweep_mode: SweepMode,
    pub site: SiteAttributes,
    pub metrics: IngestMetrics,
}

impl ProtoVolume {
    pub fn ray_count(&self) -> usize {
        self.azimuth.len()
    }

    pub fn range_bins(&self) -> usize {
        self.range.distances.len()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.time.first().copied()
    }

    pub fn time_units(&self) -> Option<String> {
        self.start_time().map(|start| {
            format!(
                "seconds since {}",
                start.to_rfc3339_opts(SecondsFormat::Secs, true)
            )
        })
    }

    /// Renames fields by `mapping`; fields without an entry keep their key.
    pub fn rename_fields(&mut self, mapping: &BTreeMap<String, String>) {
        let fields = std::mem::take(&mut self.fields);
        self.fields = fields
            .into_iter()
            .map(|(key, field)| match mapping.get(&key) {
                Some(name) => (name.clone(), field),
                None => (key, field),
            })
            .collect();
    }

    /// Keeps fields named in `include` (all when empty) and not in `exclude`.
    pub fn retain_fields(&mut self, include: &[String], exclude: &[String]) {
        let include: HashSet<&str> = include.iter().map(String::as_str).collect();
        let exclude: HashSet<&str> = exclude.iter().map(String::as_str).collect();
        self.fields.retain(|name, _| {
            (include.is_empty() || include.contains(name.as_str()))
                && !exclude.contains(name.as_str())
        });
    }
}
