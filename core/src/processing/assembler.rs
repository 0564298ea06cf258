use std::collections::{BTreeMap, BTreeSet};

use crate::interface::{DecodedField, ProtoVolume, ScanRecord, SiteAttributes, SweepMode};
use crate::prelude::{AssemblerConfig, ScanSource, SweepGrouping, VolumeError, VolumeResult};
use crate::processing::quantization::QuantizationDecoder;
use crate::processing::range_extent::RangeExtentReconciler;
use crate::processing::ray_metadata::{RayMetadata, RayMetadataExtractor};
use crate::processing::sweep_index::SweepIndex;
use crate::processing::timing::{TimingAccumulator, TimingReconstructor};
use crate::telemetry::{LogManager, MetricsRecorder};

/// Running concatenation buffers, present once the first sweep is in.
struct Accumulation {
    azimuth: Vec<f64>,
    elevation: Vec<f64>,
    sweep_of_ray: Vec<usize>,
    unambiguous_range: Vec<f64>,
    nyquist_velocity: Vec<f64>,
    fields: BTreeMap<String, DecodedField>,
}

impl Accumulation {
    fn start(sweep: usize, rays: RayMetadata, fields: BTreeMap<String, DecodedField>) -> Self {
        let mut acc = Self {
            azimuth: Vec::new(),
            elevation: Vec::new(),
            sweep_of_ray: Vec::new(),
            unambiguous_range: Vec::new(),
            nyquist_velocity: Vec::new(),
            fields,
        };
        acc.extend_rays(sweep, rays);
        acc
    }

    fn extend_rays(&mut self, sweep: usize, rays: RayMetadata) {
        self.sweep_of_ray
            .extend(std::iter::repeat(sweep).take(rays.len()));
        self.azimuth.extend(rays.azimuth.iter().copied());
        self.elevation.extend(rays.elevation.iter().copied());
        self.unambiguous_range.extend(rays.unambiguous_range.iter().copied());
        self.nyquist_velocity.extend(rays.nyquist_velocity.iter().copied());
    }

    fn extend(
        &mut self,
        sweep: usize,
        rays: RayMetadata,
        fields: BTreeMap<String, DecodedField>,
    ) -> VolumeResult<()> {
        for (name, decoded) in fields {
            let field = self.fields.get_mut(&name).ok_or_else(|| {
                VolumeError::InvalidInput(format!("moment `{}` appeared after sweep 0", name))
            })?;
            field.append(&decoded)?;
        }
        self.extend_rays(sweep, rays);
        Ok(())
    }
}

enum AssemblerState {
    Empty,
    Accumulating(Accumulation),
}

/// Turns the sweeps of one file into a [`ProtoVolume`].
///
/// An assembler is consumed by [`VolumeAssembler::assemble`]; build a new one
/// for every ingestion.
pub struct VolumeAssembler {
    config: AssemblerConfig,
    decoder: QuantizationDecoder,
    timing: TimingAccumulator,
    state: AssemblerState,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl VolumeAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            decoder: QuantizationDecoder::new(config.fill_value),
            config,
            timing: TimingAccumulator::new(),
            state: AssemblerState::Empty,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("assembler"),
        }
    }

    pub fn ingest<S: ScanSource>(self, source: &S) -> VolumeResult<ProtoVolume> {
        let site = source.site()?;
        let scans = source.scans()?;
        self.assemble(site, &scans)
    }

    pub fn assemble(
        mut self,
        site: SiteAttributes,
        sweeps: &[ScanRecord],
    ) -> VolumeResult<ProtoVolume> {
        let ordered = order_sweeps(sweeps)?;
        let range_step = ordered[0].require_range_step()?;
        let moments = self.plan_moments(&ordered);
        let reconciler = RangeExtentReconciler::from_sweeps(ordered.iter().copied(), &moments);
        self.logger.record(&format!(
            "assembling {} sweeps, {} moments, {} range bins",
            ordered.len(),
            moments.len(),
            reconciler.common_bins()
        ));

        for sweep in &ordered {
            self.push_sweep(sweep, &moments, &reconciler)?;
        }

        self.finish(site, &reconciler, range_step)
    }

    /// Moments of the first sweep that every sweep carries in (rays, bins)
    /// layout. Anything else is skipped with a warning.
    fn plan_moments(&mut self, ordered: &[&ScanRecord]) -> Vec<String> {
        let mut planned = Vec::new();
        for name in ordered[0].moments.keys() {
            let misfit = ordered.iter().find_map(|sweep| match sweep.moments.get(name) {
                None => Some(format!("absent from sweep {}", sweep.index)),
                Some(moment) if moment.samples.nrows() != sweep.ray_count() => Some(format!(
                    "sweep {} has shape {:?} for {} rays",
                    sweep.index,
                    moment.shape(),
                    sweep.ray_count()
                )),
                Some(_) => None,
            });
            match misfit {
                Some(reason) => {
                    self.logger
                        .advise(&format!("skipping moment `{}`: {}", name, reason));
                    self.metrics.record_skipped_moment();
                }
                None => planned.push(name.clone()),
            }
        }

        let late: BTreeSet<&String> = ordered[1..]
            .iter()
            .flat_map(|sweep| sweep.moments.keys())
            .filter(|name| !ordered[0].moments.contains_key(*name))
            .collect();
        for name in late {
            self.logger.advise(&format!(
                "skipping moment `{}`: absent from sweep {}",
                name, ordered[0].index
            ));
            self.metrics.record_skipped_moment();
        }
        planned
    }

    fn push_sweep(
        &mut self,
        sweep: &ScanRecord,
        moments: &[String],
        reconciler: &RangeExtentReconciler,
    ) -> VolumeResult<()> {
        let rays = RayMetadataExtractor::extract(sweep)?;
        self.timing.observe(sweep)?;

        let expected = (rays.len(), reconciler.common_bins());
        let mut decoded = BTreeMap::new();
        for name in moments {
            let moment = sweep.moments.get(name).ok_or_else(|| {
                VolumeError::InvalidInput(format!("sweep {} lost moment `{}`", sweep.index, name))
            })?;
            let padded = reconciler.reconcile(sweep.index, name, moment.samples.view())?;
            if padded.dim() != expected {
                return Err(VolumeError::ShapeMismatch {
                    sweep: sweep.index,
                    moment: name.clone(),
                    expected,
                    found: padded.dim(),
                });
            }
            let mut field = self.decoder.decode(padded.view(), &moment.calibration)?;
            field.unit = moment.unit.clone();
            self.metrics.record_masked(field.masked_count());
            decoded.insert(name.clone(), field);
        }

        self.metrics.record_sweep(rays.len());
        self.logger.detail(&format!(
            "sweep {}: {} rays, native extent {:?}",
            sweep.index,
            rays.len(),
            sweep.moments.values().map(|m| m.samples.ncols()).max()
        ));

        self.state = match std::mem::replace(&mut self.state, AssemblerState::Empty) {
            AssemblerState::Empty => {
                AssemblerState::Accumulating(Accumulation::start(sweep.index, rays, decoded))
            }
            AssemblerState::Accumulating(mut acc) => {
                acc.extend(sweep.index, rays, decoded)?;
                AssemblerState::Accumulating(acc)
            }
        };
        Ok(())
    }

    fn finish(
        self,
        site: SiteAttributes,
        reconciler: &RangeExtentReconciler,
        range_step: f64,
    ) -> VolumeResult<ProtoVolume> {
        let acc = match self.state {
            AssemblerState::Empty => return Err(VolumeError::NoSweeps),
            AssemblerState::Accumulating(acc) => acc,
        };
        let total_rays = acc.azimuth.len();

        let expected = (total_rays, reconciler.common_bins());
        for (name, field) in &acc.fields {
            if field.dim() != expected {
                return Err(VolumeError::ShapeMismatch {
                    sweep: acc.sweep_of_ray.last().copied().unwrap_or(0),
                    moment: name.clone(),
                    expected,
                    found: field.dim(),
                });
            }
        }

        let times = TimingReconstructor::new(self.config.last_sweep_duration_s)
            .reconstruct(&self.timing, total_rays)?;

        let sweep_index = match self.config.grouping {
            SweepGrouping::BySweep => SweepIndex::by_sweep(&acc.sweep_of_ray, &acc.elevation),
            SweepGrouping::ByElevation => SweepIndex::by_elevation(&acc.elevation),
        };
        if !sweep_index.covers(total_rays) {
            self.logger.advise(&format!(
                "sweep index of {} groups does not tile {} rays",
                sweep_index.len(),
                total_rays
            ));
        }

        let metrics = self.metrics.snapshot();
        self.logger.record(&format!(
            "volume ready: {} rays, {} sweeps, {} fields, {} masked cells",
            metrics.rays,
            sweep_index.len(),
            acc.fields.len(),
            metrics.masked_cells
        ));

        Ok(ProtoVolume {
            azimuth: acc.azimuth.into(),
            elevation: acc.elevation.into(),
            sweep_of_ray: acc.sweep_of_ray.into(),
            time: times.times,
            time_offsets: times.offsets,
            unambiguous_range: acc.unambiguous_range.into(),
            nyquist_velocity: acc.nyquist_velocity.into(),
            range: reconciler.gates(range_step),
            fields: acc.fields,
            sweep_index,
            sweep_mode: SweepMode::from(site.scan_type),
            site,
            metrics,
        })
    }
}

impl Default for VolumeAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

/// Sorts by sweep ordinal. Rejects empty input, duplicate ordinals and
/// sweeps without ray headers before any work is done.
fn order_sweeps(sweeps: &[ScanRecord]) -> VolumeResult<Vec<&ScanRecord>> {
    if sweeps.is_empty() {
        return Err(VolumeError::NoSweeps);
    }
    let mut ordered: Vec<&ScanRecord> = sweeps.iter().collect();
    ordered.sort_by_key(|sweep| sweep.index);
    if let Some(pair) = ordered.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(VolumeError::DuplicateSweep {
            index: pair[0].index,
        });
    }
    for sweep in &ordered {
        sweep.require_rays()?;
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{
        Calibration, MomentData, MomentFormat, RayHeader, ScanDocument, ScanType,
    };
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone, Utc};
    use ndarray::Array2;

    const UV8: Calibration = Calibration {
        format: MomentFormat::Uv8,
        dyn_range_min: -20.0,
        dyn_range_max: 60.0,
    };

    fn site() -> SiteAttributes {
        SiteAttributes {
            latitude: -23.6,
            longitude: -46.7,
            altitude: 735.0,
            scan_type: ScanType::Ppi,
        }
    }

    fn code(ray: usize, bin: usize) -> u16 {
        1 + ((ray + bin) % 254) as u16
    }

    fn moment(rays: usize, bins: usize) -> MomentData {
        MomentData {
            calibration: UV8,
            unit: Some("dBZ".into()),
            samples: Array2::from_shape_fn((rays, bins), |(r, b)| code(r, b)),
        }
    }

    /// Sweep `index` of a volume whose intervals are 10, 12, 14, ... seconds
    /// with scan speed `2 * interval + 1`.
    fn sweep(index: usize, rays: usize, bins: usize) -> ScanRecord {
        let base = Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap();
        let offset: i64 = (0..index).map(|i| 10 + 2 * i as i64).sum();
        let interval = 10.0 + 2.0 * index as f64;
        let mut moments = BTreeMap::new();
        moments.insert("moment_0".to_string(), moment(rays, bins));
        moments.insert("moment_1".to_string(), moment(rays, bins));
        ScanRecord {
            index,
            prf: Some(1000.0),
            wavelength: Some(0.0531),
            scan_speed: Some(2.0 * interval + 1.0),
            range_step: Some(250.0),
            timestamp: Some(base + Duration::seconds(offset)),
            rays: (0..rays)
                .map(|r| RayHeader {
                    azimuth: r as f64 * 360.0 / rays as f64,
                    elevation: 0.5 + index as f64,
                })
                .collect(),
            moments,
        }
    }

    fn volume(shapes: &[(usize, usize)]) -> Vec<ScanRecord> {
        shapes
            .iter()
            .enumerate()
            .map(|(index, &(rays, bins))| sweep(index, rays, bins))
            .collect()
    }

    #[test]
    fn rays_are_conserved_and_sweeps_tile() {
        let sweeps = volume(&[(360, 20), (360, 20), (180, 20)]);
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();

        assert_eq!(out.ray_count(), 900);
        assert_eq!(out.elevation.len(), 900);
        assert_eq!(out.time.len(), 900);
        assert_eq!(out.unambiguous_range.len(), 900);
        assert_eq!(out.nyquist_velocity.len(), 900);
        for field in out.fields.values() {
            assert_eq!(field.rays(), 900);
        }

        let bounds: Vec<(usize, usize)> =
            out.sweep_index.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(bounds, vec![(0, 359), (360, 719), (720, 899)]);
        assert!(out.sweep_index.covers(900));
        assert_eq!(out.sweep_index.fixed_angles(), vec![0.5, 1.5, 2.5]);
        assert_eq!(out.metrics.sweeps, 3);
        assert_eq!(out.sweep_mode, SweepMode::ManualPpi);
    }

    #[test]
    fn width_is_the_widest_sweep_in_any_order() {
        let sweeps = volume(&[(4, 100), (4, 60), (4, 80)]);
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        assert_eq!(out.range_bins(), 100);
        assert!(out.fields.values().all(|f| f.range_bins() == 100));

        // Widest sweep last: the first sweep no longer fixes the extent.
        let sweeps = volume(&[(4, 60), (4, 80), (4, 100)]);
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        assert_eq!(out.range_bins(), 100);
        assert_eq!(out.range.distances[99], 25_000.0);
    }

    #[test]
    fn padding_keeps_native_samples_and_masks_the_rest() {
        let sweeps = volume(&[(4, 100), (4, 60), (4, 80)]);
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        let field = &out.fields["moment_0"];

        // Ray 5 is ray 1 of sweep 1, which has 60 native bins.
        for bin in 0..60 {
            let expected = QuantizationDecoder::decode_value(code(1, bin), &UV8);
            assert_abs_diff_eq!(field.value(5, bin).unwrap(), expected, epsilon = 1e-12);
        }
        for bin in 60..100 {
            assert!(field.is_masked(5, bin));
        }
        assert_eq!(out.metrics.masked_cells, 2 * (4 * 40 + 4 * 20));
    }

    #[test]
    fn zero_codes_are_masked_in_the_volume() {
        let mut sweeps = volume(&[(3, 5), (3, 5), (3, 5)]);
        if let Some(m) = sweeps[1].moments.get_mut("moment_0") {
            m.samples[[2, 3]] = 0;
        }
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        let field = &out.fields["moment_0"];
        assert!(field.is_masked(5, 3));
        assert_eq!(field.masked_count(), 1);
        assert_eq!(out.fields["moment_1"].masked_count(), 0);
    }

    #[test]
    fn time_is_strictly_increasing_over_extrapolated_span() {
        let sweeps = volume(&[(360, 10), (360, 10), (180, 10)]);
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();

        assert!(out.time.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(out.time[0], sweeps[0].timestamp.unwrap());
        // intervals 10 + 12, last sweep extrapolated to 14 s
        assert_abs_diff_eq!(out.time_offsets[450], 18.0, epsilon = 1e-6);
        assert_eq!(
            out.time_units().unwrap(),
            "seconds since 2017-03-01T12:00:00Z"
        );
    }

    #[test]
    fn constant_intervals_abort_without_partial_volume() {
        let mut sweeps = volume(&[(4, 5), (4, 5), (4, 5)]);
        let base = sweeps[0].timestamp.unwrap();
        for (i, s) in sweeps.iter_mut().enumerate() {
            s.timestamp = Some(base + Duration::seconds(10 * i as i64));
            s.scan_speed = Some(5.0);
        }
        let err = VolumeAssembler::default().assemble(site(), &sweeps).unwrap_err();
        assert!(matches!(err, VolumeError::DegenerateFit { .. }));
    }

    #[test]
    fn single_sweep_round_trips_with_explicit_duration() {
        let mut record = sweep(0, 6, 8);
        record.moments.remove("moment_1");
        let config = AssemblerConfig {
            last_sweep_duration_s: Some(6.0),
            ..Default::default()
        };
        let out = VolumeAssembler::new(config)
            .assemble(site(), &[record.clone()])
            .unwrap();

        let field = &out.fields["moment_0"];
        assert_eq!(field.dim(), (6, 8));
        assert_eq!(field.masked_count(), 0);
        for ((ray, bin), &raw) in record.moments["moment_0"].samples.indexed_iter() {
            let expected = -20.0 + f64::from(raw) * 80.0 / 254.0;
            assert_abs_diff_eq!(field.value(ray, bin).unwrap(), expected, epsilon = 1e-12);
        }
        assert_eq!(field.unit.as_deref(), Some("dBZ"));
        assert_eq!(out.time_offsets.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn single_sweep_without_duration_is_fatal() {
        let err = VolumeAssembler::default()
            .assemble(site(), &[sweep(0, 6, 8)])
            .unwrap_err();
        assert!(matches!(err, VolumeError::InsufficientSweeps { .. }));
    }

    #[test]
    fn misshapen_moment_is_skipped_not_fatal() {
        let mut sweeps = volume(&[(4, 5), (4, 5), (4, 5)]);
        if let Some(m) = sweeps[2].moments.get_mut("moment_1") {
            m.samples = Array2::from_elem((3, 5), 9);
        }
        sweeps[1]
            .moments
            .insert("moment_9".to_string(), moment(4, 5));

        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        assert!(out.fields.contains_key("moment_0"));
        assert!(!out.fields.contains_key("moment_1"));
        assert!(!out.fields.contains_key("moment_9"));
        assert_eq!(out.metrics.skipped_moments, 2);
        assert_eq!(out.ray_count(), 12);
    }

    #[test]
    fn late_moment_is_counted_once() {
        let mut sweeps = volume(&[(4, 5), (4, 5), (4, 5)]);
        for sweep in &mut sweeps[1..] {
            sweep.moments.insert("moment_9".to_string(), moment(4, 5));
        }
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        assert!(!out.fields.contains_key("moment_9"));
        assert_eq!(out.metrics.skipped_moments, 1);
    }

    #[test]
    fn missing_wavelength_is_fatal() {
        let mut sweeps = volume(&[(4, 5), (4, 5), (4, 5)]);
        sweeps[1].wavelength = None;
        let err = VolumeAssembler::default().assemble(site(), &sweeps).unwrap_err();
        assert!(matches!(
            err,
            VolumeError::MissingAttribute {
                sweep: 1,
                name: "wavelength"
            }
        ));
    }

    #[test]
    fn sweeps_are_processed_in_index_order() {
        let mut sweeps = volume(&[(2, 5), (3, 5), (4, 5)]);
        sweeps.reverse();
        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        assert_eq!(out.sweep_of_ray.to_vec(), vec![0, 0, 1, 1, 1, 2, 2, 2, 2]);
        assert_eq!(out.elevation[0], 0.5);
    }

    #[test]
    fn duplicate_and_empty_inputs_are_rejected() {
        let sweeps = vec![sweep(0, 2, 5), sweep(0, 2, 5)];
        assert!(matches!(
            VolumeAssembler::default().assemble(site(), &sweeps),
            Err(VolumeError::DuplicateSweep { index: 0 })
        ));
        assert!(matches!(
            VolumeAssembler::default().assemble(site(), &[]),
            Err(VolumeError::NoSweeps)
        ));
    }

    #[test]
    fn elevation_grouping_merges_repeated_angles() {
        let mut sweeps = volume(&[(2, 5), (2, 5), (2, 5)]);
        for ray in sweeps[2].rays.iter_mut() {
            ray.elevation = 0.5;
        }
        let config = AssemblerConfig {
            grouping: SweepGrouping::ByElevation,
            ..Default::default()
        };
        let out = VolumeAssembler::new(config).assemble(site(), &sweeps).unwrap();
        assert_eq!(out.sweep_index.len(), 2);
        assert!(!out.sweep_index.covers(6));

        let out = VolumeAssembler::default().assemble(site(), &sweeps).unwrap();
        assert_eq!(out.sweep_index.len(), 3);
    }

    #[test]
    fn ingest_reads_from_a_scan_source() {
        let doc = ScanDocument::new(site(), volume(&[(3, 4), (3, 4), (3, 4)]));
        let out = VolumeAssembler::default().ingest(&doc).unwrap();
        assert_eq!(out.ray_count(), 9);
        assert_eq!(out.site, site());
    }
}
