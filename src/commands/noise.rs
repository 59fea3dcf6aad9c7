use anyhow::Result;
use colored::Colorize;

use crate::config::SweepConfig;
use crate::core::noise::{noise_probability, LinkQuality};

/// Table of the local noise model; never touches the network.
pub fn table(cfg: &SweepConfig, distances: Option<Vec<f64>>, repeaters: u32, eve: bool) -> Result<()> {
    let distances = distances.unwrap_or_else(|| cfg.distances.clone());
    println!("{:>8}  {:>6}  {}", "km".bold(), "p".bold(), "link".bold());
    for d in distances {
        let p = noise_probability(d, repeaters, eve);
        let quality = LinkQuality::classify(p);
        let label = match quality {
            LinkQuality::Good => quality.label().green(),
            LinkQuality::Degraded => quality.label().yellow(),
            LinkQuality::Insecure => quality.label().red(),
        };
        println!("{d:>8}  {p:>6.3}  {label}");
    }
    Ok(())
}
