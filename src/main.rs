use clap::Parser; // trait import enables SweepCli::parse()

use qkd_sweep::cli::{Command, SweepCli};
use qkd_sweep::commands;
use qkd_sweep::config::{resolve_config_path, SweepConfig};

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = SweepCli::parse();
    init_logging(args.verbose);

    let cfg_path = resolve_config_path(&args.config);
    let cfg = SweepConfig::load_or_default(cfg_path.as_deref())?;

    match args.cmd {
        Command::Sweep { distances, repeaters, compare, compare_repeaters, eve, csv, remote } => {
            let mode = if compare_repeaters {
                commands::sweep::Comparison::Repeaters { eve }
            } else if compare {
                commands::sweep::Comparison::Eavesdropper
            } else {
                commands::sweep::Comparison::Off
            };
            commands::sweep::sweep(cfg, distances, repeaters, mode, csv, remote)
        }
        Command::Single { distance, repeaters, eve, remote } => {
            commands::single::single(cfg, distance, repeaters, eve, remote)
        }
        Command::Noise { distances, repeaters, eve } => commands::noise::table(&cfg, distances, repeaters, eve),
    }
}
