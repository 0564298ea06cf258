use ndarray::{Array1, Array2, ArrayView2};

use crate::interface::{RangeGates, ScanRecord};
use crate::math::matrix::MatrixHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{VolumeError, VolumeResult};

/// Brings every sweep's moments to one common range-bin extent.
///
/// The common extent is the widest moment seen across all sweeps, found in a
/// pre-pass, so sweep order does not matter and nothing is ever truncated.
/// Padding columns hold code 0 and therefore decode as masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeExtentReconciler {
    common_bins: usize,
}

impl RangeExtentReconciler {
    pub fn new(common_bins: usize) -> Self {
        Self { common_bins }
    }

    /// Scans the named moments of every sweep for the widest extent.
    pub fn from_sweeps<'a, I>(sweeps: I, moments: &[String]) -> Self
    where
        I: IntoIterator<Item = &'a ScanRecord>,
    {
        let common_bins = sweeps
            .into_iter()
            .flat_map(move |sweep| {
                moments
                    .iter()
                    .filter_map(move |name| sweep.moments.get(name))
                    .map(|moment| moment.samples.ncols())
            })
            .max()
            .unwrap_or(0);
        Self { common_bins }
    }

    pub fn common_bins(&self) -> usize {
        self.common_bins
    }

    /// Gate distances `step * (k + 1)` across the common extent.
    pub fn gates(&self, range_step: f64) -> RangeGates {
        let distances: Array1<f64> = (0..self.common_bins)
            .map(|bin| range_step + range_step * bin as f64)
            .collect();
        let spacing: Vec<f64> = distances
            .as_slice()
            .unwrap_or(&[])
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect();
        RangeGates {
            meters_to_center_of_first_gate: distances.get(0).map_or(0.0, |first| first / 2.0),
            meters_between_gates: StatsHelper::median(&spacing).unwrap_or(range_step),
            distances,
        }
    }

    pub fn reconcile(
        &self,
        sweep: usize,
        moment: &str,
        samples: ArrayView2<u16>,
    ) -> VolumeResult<Array2<u16>> {
        MatrixHelper::pad_columns(samples, self.common_bins).ok_or_else(|| {
            VolumeError::ShapeMismatch {
                sweep,
                moment: moment.to_string(),
                expected: (samples.nrows(), self.common_bins),
                found: samples.dim(),
            }
        })
    }
}
