use chrono::{DateTime, Duration, Utc};
use ndarray::Array1;

use crate::interface::ScanRecord;
use crate::math::stats::StatsHelper;
use crate::prelude::{VolumeError, VolumeResult};
use crate::telemetry::LogManager;

/// Fit points needed before the last sweep's duration can be extrapolated.
pub const MIN_FIT_POINTS: usize = 2;

/// Running per-sweep timing observations of one ingestion.
///
/// Each sweep's timestamp closes the previous sweep's interval; the interval
/// is paired with the previous sweep's scan speed. The final sweep has no
/// closing timestamp, which is what the reconstructor extrapolates.
#[derive(Debug, Default)]
pub struct TimingAccumulator {
    start: Option<DateTime<Utc>>,
    previous: Option<(usize, DateTime<Utc>, Option<f64>)>,
    intervals: Vec<f64>,
    speeds: Vec<(usize, Option<f64>)>,
}

impl TimingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sweep: &ScanRecord) -> VolumeResult<()> {
        let timestamp = sweep.require_timestamp()?;
        if let Some((index, previous, speed)) = self.previous.take() {
            let elapsed = (timestamp - previous).num_milliseconds() as f64 / 1e3;
            self.intervals.push(elapsed);
            self.speeds.push((index, speed));
        }
        self.start.get_or_insert(timestamp);
        self.previous = Some((sweep.index, timestamp, sweep.scan_speed));
        Ok(())
    }

    pub fn intervals(&self) -> &[f64] {
        &self.intervals
    }
}

/// Absolute and relative time of every ray in the volume.
#[derive(Debug, Clone)]
pub struct RayTimes {
    pub times: Vec<DateTime<Utc>>,
    pub offsets: Array1<f64>,
    pub total_seconds: f64,
}

pub struct TimingReconstructor {
    last_sweep_duration_s: Option<f64>,
    logger: LogManager,
}

impl TimingReconstructor {
    pub fn new(last_sweep_duration_s: Option<f64>) -> Self {
        Self {
            last_sweep_duration_s,
            logger: LogManager::new("timing"),
        }
    }

    /// Estimates the final sweep's duration from a least-squares line of scan
    /// speed against interval length, rounded to whole seconds.
    pub fn extrapolate_last_duration(&self, accumulator: &TimingAccumulator) -> VolumeResult<f64> {
        let available = accumulator.intervals.len();
        if available < MIN_FIT_POINTS {
            return Err(VolumeError::InsufficientSweeps {
                available,
                required: MIN_FIT_POINTS,
            });
        }

        let speeds = accumulator
            .speeds
            .iter()
            .map(|&(sweep, speed)| {
                speed.ok_or(VolumeError::MissingAttribute {
                    sweep,
                    name: "scan_speed",
                })
            })
            .collect::<VolumeResult<Vec<f64>>>()?;
        let (last_index, _, last_speed) =
            accumulator.previous.ok_or(VolumeError::NoSweeps)?;
        let last_speed = last_speed.ok_or(VolumeError::MissingAttribute {
            sweep: last_index,
            name: "scan_speed",
        })?;

        let fit = StatsHelper::linear_fit(&accumulator.intervals, &speeds).ok_or_else(|| {
            VolumeError::DegenerateFit {
                reason: "sweep intervals are all equal".into(),
            }
        })?;
        let raw = fit
            .solve_for_x(last_speed)
            .ok_or_else(|| VolumeError::DegenerateFit {
                reason: format!("scan speed does not vary with interval (slope {})", fit.slope),
            })?;
        if !raw.is_finite() {
            return Err(VolumeError::DegenerateFit {
                reason: format!("extrapolated duration {} is not finite", raw),
            });
        }

        // Sub-second precision is dropped here.
        let rounded = raw.round_ties_even();
        self.logger.detail(&format!(
            "last sweep duration {:.3}s rounded to {}s (slope {:.4}, intercept {:.4})",
            raw, rounded, fit.slope, fit.intercept
        ));
        Ok(rounded)
    }

    /// Spreads `total_rays` uniformly over the whole volume duration.
    pub fn reconstruct(
        &self,
        accumulator: &TimingAccumulator,
        total_rays: usize,
    ) -> VolumeResult<RayTimes> {
        let start = accumulator.start.ok_or(VolumeError::NoSweeps)?;
        let last = match self.last_sweep_duration_s {
            Some(seconds) => seconds,
            None => self.extrapolate_last_duration(accumulator)?,
        };
        let total_seconds = accumulator.intervals.iter().sum::<f64>() + last;
        if !total_seconds.is_finite() {
            return Err(VolumeError::InvalidInput(format!(
                "volume duration {} is not finite",
                total_seconds
            )));
        }

        let total_us = total_seconds * 1e6;
        if total_rays == 0 || !(total_us / total_rays as f64 >= 1.0) {
            return Err(VolumeError::NonMonotonicTime {
                total_seconds,
                rays: total_rays,
            });
        }

        let mut times = Vec::with_capacity(total_rays);
        let mut offsets = Array1::<f64>::zeros(total_rays);
        for (ray, offset) in offsets.iter_mut().enumerate() {
            let micros = (ray as f64 * total_us / total_rays as f64).round() as i64;
            let time = start
                .checked_add_signed(Duration::microseconds(micros))
                .ok_or_else(|| {
                    VolumeError::InvalidInput(format!(
                        "ray {} at {:.0}s past {} is out of range",
                        ray,
                        micros as f64 / 1e6,
                        start
                    ))
                })?;
            times.push(time);
            *offset = micros as f64 / 1e6;
        }

        self.logger.record(&format!(
            "volume spans {:.1}s over {} rays",
            total_seconds, total_rays
        ));
        Ok(RayTimes {
            times,
            offsets,
            total_seconds,
        })
    }
}
