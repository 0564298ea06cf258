use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;
use volcore::interface::{ProtoVolume, ScanDocument};
use volcore::prelude::ScanSource;
use volcore::processing::VolumeAssembler;
use volcore::telemetry::IngestMetrics;

use crate::workflow::config::WorkflowConfig;

/// Printable digest of a normalized volume.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub source: String,
    pub sweeps: usize,
    pub rays: usize,
    pub range_bins: usize,
    pub fields: Vec<String>,
    pub fixed_angles: Vec<f64>,
    pub sweep_mode: String,
    pub time_units: Option<String>,
    pub duration_s: f64,
    pub metrics: IngestMetrics,
}

#[derive(Debug)]
pub struct WorkflowResult {
    pub volume: ProtoVolume,
    pub summary: IngestSummary,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Reads a YAML or JSON dump of the file reader's output.
    pub fn load_document<P: AsRef<Path>>(path: P) -> anyhow::Result<ScanDocument> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading sweep dump {}", path_ref.display()))?;
        let extension = path_ref
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let document = match extension.as_deref() {
            Some("json") => ScanDocument::from_json(&contents)
                .with_context(|| format!("parsing sweep dump {}", path_ref.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing sweep dump {}", path_ref.display()))?,
            _ => bail!(
                "unsupported sweep dump {}: expected .json, .yaml or .yml",
                path_ref.display()
            ),
        };
        Ok(document)
    }

    pub fn execute<S: ScanSource>(&self, source: &S) -> anyhow::Result<WorkflowResult> {
        let assembler = VolumeAssembler::new(self.config.to_assembler_config());
        let mut volume = assembler
            .ingest(source)
            .context("assembling normalized volume")?;

        volume.rename_fields(&self.config.field_names);
        volume.retain_fields(&self.config.include_fields, &self.config.exclude_fields);

        let summary = IngestSummary {
            source: self.config.source_label.clone(),
            sweeps: volume.sweep_index.len(),
            rays: volume.ray_count(),
            range_bins: volume.range_bins(),
            fields: volume.fields.keys().cloned().collect(),
            fixed_angles: volume.sweep_index.fixed_angles(),
            sweep_mode: volume.sweep_mode.as_str().to_string(),
            time_units: volume.time_units(),
            duration_s: volume.time_offsets.iter().copied().fold(0.0, f64::max),
            metrics: volume.metrics,
        };

        Ok(WorkflowResult { volume, summary })
    }
}
