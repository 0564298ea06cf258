use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use volcore::prelude::{AssemblerConfig, SweepGrouping};

/// Source moment keys and the field names they are published under.
pub fn default_field_names() -> BTreeMap<String, String> {
    [
        ("moment_0", "corrected_reflectivity"),
        ("moment_1", "reflectivity"),
        ("moment_2", "velocity"),
        ("moment_3", "spectrum_width"),
        ("moment_4", "differential_reflectivity"),
        ("moment_5", "filtered_differential_phase"),
        ("moment_6", "differential_phase"),
        ("moment_7", "specific_differential_phase"),
        ("moment_8", "cross_correlation_ratio"),
    ]
    .into_iter()
    .map(|(key, name)| (key.to_string(), name.to_string()))
    .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub assembler: AssemblerConfig,
    pub field_names: BTreeMap<String, String>,
    /// Applied after renaming. Empty keeps every field.
    pub include_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
    pub source_label: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            assembler: AssemblerConfig::default(),
            field_names: default_field_names(),
            include_fields: Vec::new(),
            exclude_fields: Vec::new(),
            source_label: "Brazil Radar".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(last_sweep_duration_s: Option<f64>, by_elevation: bool) -> Self {
        let mut config = Self::default();
        config.apply_overrides(last_sweep_duration_s, by_elevation);
        config
    }

    /// Command-line flags win over a loaded file; unset flags leave it alone.
    pub fn apply_overrides(&mut self, last_sweep_duration_s: Option<f64>, by_elevation: bool) {
        if last_sweep_duration_s.is_some() {
            self.assembler.last_sweep_duration_s = last_sweep_duration_s;
        }
        if by_elevation {
            self.assembler.grouping = SweepGrouping::ByElevation;
        }
    }

    pub fn to_assembler_config(&self) -> AssemblerConfig {
        self.assembler.clone()
    }
}
