use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use super::{print_report, runtime, terminal_runner, with_overrides};
use crate::cli::RemoteArgs;
use crate::config::SweepConfig;
use crate::core::export::write_csv;
use crate::core::orchestrator::SweepPlan;

/// Second run per distance, as picked on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Off,
    Eavesdropper,
    Repeaters { eve: bool },
}

pub fn sweep(
    cfg: SweepConfig,
    distances: Option<Vec<f64>>,
    repeaters: u32,
    comparison: Comparison,
    csv: Option<PathBuf>,
    remote: RemoteArgs,
) -> Result<()> {
    let cfg = with_overrides(cfg, &remote)?;
    let distances = distances.unwrap_or_else(|| cfg.distances.clone());
    let plan = match comparison {
        Comparison::Off => SweepPlan::sweep(distances, repeaters, false)?,
        Comparison::Eavesdropper => SweepPlan::sweep(distances, repeaters, true)?,
        Comparison::Repeaters { eve } => SweepPlan::repeater_comparison(distances, repeaters, eve)?,
    };
    let plan = plan.with_qubits(cfg.qubits)?.with_pacing(cfg.pacing());

    println!("{}", "Running sweep...".bold());
    let mut runner = terminal_runner(&cfg)?;
    let outcome = runtime()?.block_on(runner.run(plan));

    // Points recorded before a failure are still worth exporting.
    if let (Some(path), Some(report)) = (&csv, runner.report()) {
        write_csv(path, &report.points).with_context(|| format!("writing {}", path.display()))?;
        println!("csv: wrote {} rows to '{}'", report.points.len(), path.display());
    }

    let report = outcome?;
    println!("{}", "Simulation Complete".green().bold());
    print_report(&report, remote.json)
}
