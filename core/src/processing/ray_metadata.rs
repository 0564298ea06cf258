use ndarray::Array1;

use crate::interface::ScanRecord;
use crate::prelude::VolumeResult;

/// Propagation speed used for the unambiguous range, m/s.
pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Per-ray geometry and instrument limits of one sweep, in stored ray order.
#[derive(Debug, Clone)]
pub struct RayMetadata {
    pub azimuth: Array1<f64>,
    pub elevation: Array1<f64>,
    pub unambiguous_range: Array1<f64>,
    pub nyquist_velocity: Array1<f64>,
}

impl RayMetadata {
    pub fn len(&self) -> usize {
        self.azimuth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.azimuth.is_empty()
    }
}

pub struct RayMetadataExtractor;

impl RayMetadataExtractor {
    pub fn unambiguous_range(prf: f64) -> f64 {
        SPEED_OF_LIGHT / (2.0 * prf)
    }

    pub fn nyquist_velocity(prf: f64, wavelength: f64) -> f64 {
        prf * wavelength / 4.0
    }

    pub fn extract(sweep: &ScanRecord) -> VolumeResult<RayMetadata> {
        let rays = sweep.require_rays()?;
        let prf = sweep.require_prf()?;
        let wavelength = sweep.require_wavelength()?;

        let azimuth: Array1<f64> = rays.iter().map(|ray| ray.azimuth).collect();
        let elevation: Array1<f64> = rays.iter().map(|ray| ray.elevation).collect();
        let count = rays.len();

        Ok(RayMetadata {
            azimuth,
            elevation,
            unambiguous_range: Array1::from_elem(count, Self::unambiguous_range(prf)),
            nyquist_velocity: Array1::from_elem(count, Self::nyquist_velocity(prf, wavelength)),
        })
    }
}
