use serde::{Deserialize, Serialize};

/// Counters gathered during one ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestMetrics {
    pub sweeps: usize,
    pub rays: usize,
    pub skipped_moments: usize,
    pub masked_cells: usize,
}

/// Owned by a single assembler, so no locking.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    inner: IngestMetrics,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sweep(&mut self, rays: usize) {
        self.inner.sweeps += 1;
        self.inner.rays += rays;
    }

    pub fn record_skipped_moment(&mut self) {
        self.inner.skipped_moments += 1;
    }

    pub fn record_masked(&mut self, cells: usize) {
        self.inner.masked_cells += cells;
    }

    pub fn snapshot(&self) -> IngestMetrics {
        self.inner
    }
}
