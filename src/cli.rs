use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "qkd-sweep",
    about = "QKD link demo: distance sweeps, eavesdropper and repeater comparison, live noise view",
    version,
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct SweepCli {
    /// Global: path to config (TOML); default: ~/.qkd-sweep/config.toml
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Global: debug logging on stderr
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

/// Connection overrides shared by the commands that reach the simulator.
#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    /// Simulate endpoint URL (overrides config)
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds (overrides config)
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Animation speed multiplier (overrides config)
    #[arg(long = "speed", value_name = "X")]
    pub speed: Option<f64>,

    /// Print the final report as JSON instead of the summary
    #[arg(long = "json", action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a distance sweep against the simulator
    ///
    /// Examples:
    ///   qkd-sweep sweep --repeaters 1 --compare --csv results.csv
    ///   qkd-sweep sweep --distances 5,25,50
    ///   qkd-sweep sweep --repeaters 2 --compare-repeaters --eve
    Sweep {
        /// Comma-separated distances in km (default from config: 10,20,...,100)
        #[arg(long = "distances", value_name = "KM,...", value_delimiter = ',')]
        distances: Option<Vec<f64>>,

        #[arg(long = "repeaters", value_name = "N", default_value_t = 0)]
        repeaters: u32,

        /// Pair every distance with an eavesdropper-present run
        #[arg(long = "compare", action = ArgAction::SetTrue)]
        compare: bool,

        /// Pair every distance's bare link with the same link over --repeaters
        #[arg(long = "compare-repeaters", action = ArgAction::SetTrue, conflicts_with = "compare")]
        compare_repeaters: bool,

        /// Eavesdropper on both runs of a repeater comparison
        #[arg(long = "eve", action = ArgAction::SetTrue, requires = "compare_repeaters")]
        eve: bool,

        /// Write Distance,QBER_Normal,QBER_Eve to FILE
        #[arg(long = "csv", value_name = "FILE")]
        csv: Option<PathBuf>,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// One simulation at a single distance
    Single {
        #[arg(long = "distance", value_name = "KM", default_value_t = 10.0)]
        distance: f64,

        #[arg(long = "repeaters", value_name = "N", default_value_t = 0)]
        repeaters: u32,

        /// Put an eavesdropper on the link
        #[arg(long = "eve", action = ArgAction::SetTrue)]
        eve: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Print the local noise model (no network)
    Noise {
        #[arg(long = "distances", value_name = "KM,...", value_delimiter = ',')]
        distances: Option<Vec<f64>>,

        #[arg(long = "repeaters", value_name = "N", default_value_t = 0)]
        repeaters: u32,

        #[arg(long = "eve", action = ArgAction::SetTrue)]
        eve: bool,
    },
}
