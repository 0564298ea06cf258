use std::collections::BTreeMap;

use anyhow::{ensure, Context};
use chrono::{Duration, TimeZone, Utc};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use volcore::interface::{
    Calibration, MomentData, MomentFormat, RayHeader, ScanDocument, ScanRecord, ScanType,
    SiteAttributes,
};

/// Scan speed falls linearly as sweeps get longer: `speed = A - B * interval`.
const SPEED_AT_ZERO: f64 = 36.0;
const SPEED_PER_SECOND: f64 = 0.9;

/// Moments written into every synthetic sweep: name, format, range, unit.
const MOMENTS: [(&str, MomentFormat, f64, f64, &str); 3] = [
    ("moment_0", MomentFormat::Uv8, -31.5, 95.5, "dBZ"),
    ("moment_1", MomentFormat::Uv8, -31.5, 95.5, "dBZ"),
    ("moment_2", MomentFormat::Uv16, -16.0, 16.0, "m/s"),
];

/// Configuration for generating a synthetic multi-sweep volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sweeps: usize,
    pub rays_per_sweep: usize,
    /// Extent of the first sweep; later sweeps lose `range_taper` bins each.
    pub range_bins: usize,
    pub range_taper: usize,
    pub range_step: f64,
    pub first_elevation: f64,
    pub elevation_step: f64,
    /// Duration of the first sweep; each later sweep lasts `interval_growth_s` longer.
    pub base_interval_s: i64,
    pub interval_growth_s: i64,
    pub prf: f64,
    pub wavelength: f64,
    /// Share of cells left at code 0.
    pub gap_fraction: f64,
    pub seed: u64,
    pub scan_type: ScanType,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sweeps: 5,
            rays_per_sweep: 360,
            range_bins: 480,
            range_taper: 40,
            range_step: 250.0,
            first_elevation: 0.5,
            elevation_step: 1.0,
            base_interval_s: 20,
            interval_growth_s: 2,
            prf: 1000.0,
            wavelength: 0.0531,
            gap_fraction: 0.1,
            seed: 0,
            scan_type: ScanType::Ppi,
        }
    }
}

impl GeneratorConfig {
    fn normalized_rays(&self) -> usize {
        self.rays_per_sweep.max(1)
    }

    fn bins_for(&self, sweep: usize) -> usize {
        self.range_bins
            .saturating_sub(sweep.saturating_mul(self.range_taper))
            .max(1)
    }

    fn interval_for(&self, sweep: usize) -> i64 {
        self.base_interval_s + self.interval_growth_s * sweep as i64
    }
}

fn build_samples(rng: &mut StdRng, rays: usize, bins: usize, top: u16, gaps: f64) -> Array2<u16> {
    Array2::from_shape_fn((rays, bins), |_| {
        if rng.gen_bool(gaps) {
            0
        } else {
            rng.gen_range(1..=top)
        }
    })
}

pub fn build_scan_document(config: &GeneratorConfig) -> anyhow::Result<ScanDocument> {
    ensure!(config.sweeps > 0, "generator needs at least one sweep");
    ensure!(
        (0.0..=1.0).contains(&config.gap_fraction),
        "gap fraction {} outside [0, 1]",
        config.gap_fraction
    );

    let start = Utc
        .with_ymd_and_hms(2017, 3, 1, 12, 0, 0)
        .single()
        .context("building generator start time")?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let rays = config.normalized_rays();
    let mut elapsed = 0;
    let mut sweeps = Vec::with_capacity(config.sweeps);

    for index in 0..config.sweeps {
        let bins = config.bins_for(index);
        let interval = config.interval_for(index);
        let elevation = config.first_elevation + config.elevation_step * index as f64;

        let mut moments = BTreeMap::new();
        for (name, format, min, max, unit) in MOMENTS {
            let top = match format {
                MomentFormat::Uv8 => 254,
                MomentFormat::Uv16 => 65534,
            };
            moments.insert(
                name.to_string(),
                MomentData {
                    calibration: Calibration {
                        format,
                        dyn_range_min: min,
                        dyn_range_max: max,
                    },
                    unit: Some(unit.to_string()),
                    samples: build_samples(&mut rng, rays, bins, top, config.gap_fraction),
                },
            );
        }

        sweeps.push(ScanRecord {
            index,
            prf: Some(config.prf),
            wavelength: Some(config.wavelength),
            scan_speed: Some(SPEED_AT_ZERO - SPEED_PER_SECOND * interval as f64),
            range_step: Some(config.range_step),
            timestamp: Some(start + Duration::seconds(elapsed)),
            rays: (0..rays)
                .map(|ray| RayHeader {
                    azimuth: (ray as f64 + 0.5) * 360.0 / rays as f64,
                    elevation,
                })
                .collect(),
            moments,
        });
        elapsed += interval;
    }

    let site = SiteAttributes {
        latitude: -23.6,
        longitude: -46.7,
        altitude: 735.0,
        scan_type: config.scan_type,
    };
    Ok(ScanDocument::new(site, sweeps))
}

/// Total seconds the generated volume spans, last sweep included.
#[cfg(test)]
pub fn expected_duration(config: &GeneratorConfig) -> i64 {
    (0..config.sweeps).map(|sweep| config.interval_for(sweep)).sum()
}
