use anyhow::{bail, Context};
use clap::Parser;
use generator::profile::{build_scan_document, GeneratorConfig};
use log::info;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Normalize radar sweep dumps into a single volume")]
struct Args {
    /// Sweep dump to ingest (.json, .yaml or .yml)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Generate a synthetic volume instead of reading a dump
    #[arg(long, default_value_t = false)]
    synthetic: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 5)]
    sweeps: usize,
    #[arg(long, default_value_t = 360)]
    rays: usize,
    #[arg(long, default_value_t = 480)]
    range_bins: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Duration of the final sweep in seconds, instead of extrapolating it
    #[arg(long)]
    last_sweep_seconds: Option<f64>,
    /// Group sweeps by exact elevation value rather than by source sweep
    #[arg(long, default_value_t = false)]
    by_elevation: bool,
    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow.as_ref() {
        let mut loaded = WorkflowConfig::load(path)?;
        loaded.apply_overrides(args.last_sweep_seconds, args.by_elevation);
        loaded
    } else {
        WorkflowConfig::from_args(args.last_sweep_seconds, args.by_elevation)
    };

    let document = match (args.input.as_ref(), args.synthetic) {
        (Some(path), false) => Runner::load_document(path)?,
        (None, true) => {
            let generator = GeneratorConfig {
                sweeps: args.sweeps,
                rays_per_sweep: args.rays,
                range_bins: args.range_bins,
                seed: args.seed,
                ..Default::default()
            };
            build_scan_document(&generator).context("generating synthetic volume")?
        }
        (Some(_), true) => bail!("--input and --synthetic are mutually exclusive"),
        (None, false) => bail!("nothing to ingest: pass --input <dump> or --synthetic"),
    };
    info!("loaded {} sweeps", document.sweeps.len());

    let runner = Runner::new(workflow_config);
    let result = runner.execute(&document)?;
    let summary = &result.summary;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("serializing summary")?
        );
    } else {
        println!(
            "{} -> sweeps {}, rays {}, range bins {}, fields {:?}",
            summary.source, summary.sweeps, summary.rays, summary.range_bins, summary.fields
        );
        println!(
            "fixed angles {:?} ({}), last ray at {:.1}s, time units \"{}\"",
            summary.fixed_angles,
            summary.sweep_mode,
            summary.duration_s,
            summary.time_units.as_deref().unwrap_or("n/a")
        );
        println!(
            "gate spacing {:.1} m, first gate center {:.1} m",
            result.volume.range.meters_between_gates,
            result.volume.range.meters_to_center_of_first_gate
        );
        println!(
            "masked cells {}, skipped moments {}",
            summary.metrics.masked_cells, summary.metrics.skipped_moments
        );
    }

    Ok(())
}
