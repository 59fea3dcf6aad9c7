use anyhow::Result;
use colored::Colorize;

use super::{print_report, runtime, terminal_runner, with_overrides};
use crate::cli::RemoteArgs;
use crate::config::SweepConfig;
use crate::core::orchestrator::SweepPlan;

/// One request at one distance; the eavesdropper toggle applies to it directly.
pub fn single(cfg: SweepConfig, distance: f64, repeaters: u32, eve: bool, remote: RemoteArgs) -> Result<()> {
    let cfg = with_overrides(cfg, &remote)?;
    let plan = SweepPlan::single(distance, repeaters, eve)?
        .with_qubits(cfg.qubits)?
        .with_pacing(std::time::Duration::ZERO);

    println!("{} {} km, {} repeater(s), eve {}", "Simulating".bold(), distance, repeaters, if eve { "on" } else { "off" });
    let mut runner = terminal_runner(&cfg)?;
    let report = runtime()?.block_on(runner.run(plan))?;
    print_report(&report, remote.json)
}
