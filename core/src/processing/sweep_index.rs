use serde::{Deserialize, Serialize};

/// Inclusive ray bounds of one sweep within the volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepSpan {
    pub sweep_number: usize,
    pub fixed_angle: f64,
    pub start: usize,
    pub end: usize,
}

impl SweepSpan {
    pub fn ray_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Ordered sweep boundaries, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepIndex {
    spans: Vec<SweepSpan>,
}

impl SweepIndex {
    /// Groups rays by the sweep they were read from.
    ///
    /// The fixed angle of each group is the elevation of its first ray.
    pub fn by_sweep(sweep_of_ray: &[usize], elevation: &[f64]) -> Self {
        Self::group(sweep_of_ray, elevation, |a, b| a == b)
    }

    /// Groups rays by exact elevation value. Near-equal angles from different
    /// sweeps stay apart; equal angles in different sweeps merge, and so do
    /// `0.0` and `-0.0`.
    pub fn by_elevation(elevation: &[f64]) -> Self {
        Self::group(elevation, elevation, |a: &f64, b: &f64| a == b)
    }

    fn group<K, F>(keys: &[K], elevation: &[f64], same: F) -> Self
    where
        F: Fn(&K, &K) -> bool,
    {
        let mut groups: Vec<(&K, SweepSpan)> = Vec::new();
        for (ray, key) in keys.iter().enumerate() {
            match groups.iter_mut().find(|(k, _)| same(*k, key)) {
                Some((_, span)) => {
                    span.start = span.start.min(ray);
                    span.end = span.end.max(ray);
                }
                None => {
                    let sweep_number = groups.len();
                    groups.push((
                        key,
                        SweepSpan {
                            sweep_number,
                            fixed_angle: elevation.get(ray).copied().unwrap_or(f64::NAN),
                            start: ray,
                            end: ray,
                        },
                    ));
                }
            }
        }
        Self {
            spans: groups.into_iter().map(|(_, span)| span).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[SweepSpan] {
        &self.spans
    }

    pub fn iter(&self) -> impl Iterator<Item = &SweepSpan> {
        self.spans.iter()
    }

    pub fn fixed_angles(&self) -> Vec<f64> {
        self.spans.iter().map(|span| span.fixed_angle).collect()
    }

    /// True when the spans tile `[0, total_rays - 1]` with no gap or overlap.
    pub fn covers(&self, total_rays: usize) -> bool {
        let mut bounds: Vec<(usize, usize)> =
            self.spans.iter().map(|span| (span.start, span.end)).collect();
        bounds.sort_unstable();
        let mut next = 0;
        for (start, end) in bounds {
            if start != next || end < start {
                return false;
            }
            next = end + 1;
        }
        next == total_rays
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(counts: &[usize]) -> (Vec<usize>, Vec<f64>) {
        let mut sweep_of_ray = Vec::new();
        let mut elevation = Vec::new();
        for (sweep, &count) in counts.iter().enumerate() {
            sweep_of_ray.extend(std::iter::repeat(sweep).take(count));
            elevation.extend(std::iter::repeat(0.5 + sweep as f64).take(count));
        }
        (sweep_of_ray, elevation)
    }

    #[test]
    fn sweeps_tile_the_volume() {
        let (sweep_of_ray, elevation) = tags(&[360, 360, 180]);
        let index = SweepIndex::by_sweep(&sweep_of_ray, &elevation);

        let bounds: Vec<(usize, usize)> = index.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(bounds, vec![(0, 359), (360, 719), (720, 899)]);
        assert!(index.covers(900));
        assert!(!index.covers(901));
        assert_eq!(index.fixed_angles(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn elevation_grouping_follows_first_appearance() {
        let elevation = vec![1.5, 1.5, 0.5, 0.5, 0.5];
        let index = SweepIndex::by_elevation(&elevation);
        assert_eq!(index.len(), 2);
        assert_eq!(index.spans()[0].fixed_angle, 1.5);
        assert_eq!((index.spans()[0].start, index.spans()[0].end), (0, 1));
        assert_eq!((index.spans()[1].start, index.spans()[1].end), (2, 4));
        assert_eq!(index.spans()[1].sweep_number, 1);
    }

    #[test]
    fn sweep_tags_keep_repeated_angles_apart() {
        // Two sweeps at the same nominal elevation.
        let sweep_of_ray = vec![0, 0, 1, 1];
        let elevation = vec![0.5, 0.5, 0.5, 0.5];
        assert_eq!(SweepIndex::by_sweep(&sweep_of_ray, &elevation).len(), 2);
        assert_eq!(SweepIndex::by_elevation(&elevation).len(), 1);
    }

    #[test]
    fn jittered_elevation_splits_exact_grouping_but_not_sweep_grouping() {
        let sweep_of_ray = vec![0, 0, 0];
        let elevation = vec![0.5, 0.50001, 0.5];
        assert_eq!(SweepIndex::by_sweep(&sweep_of_ray, &elevation).len(), 1);
        let by_angle = SweepIndex::by_elevation(&elevation);
        assert_eq!(by_angle.len(), 2);
        // Rays 0 and 2 share an angle around ray 1, so the spans overlap.
        assert!(!by_angle.covers(3));
    }

    #[test]
    fn signed_zero_elevations_share_a_group() {
        let elevation = vec![0.0, -0.0, 0.0, 1.0];
        let index = SweepIndex::by_elevation(&elevation);
        assert_eq!(index.len(), 2);
        assert_eq!((index.spans()[0].start, index.spans()[0].end), (0, 2));
        assert!(index.covers(4));
    }

    #[test]
    fn empty_volume_has_empty_index() {
        let index = SweepIndex::by_sweep(&[], &[]);
        assert!(index.is_empty());
        assert!(index.covers(0));
    }
}
