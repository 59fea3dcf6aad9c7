pub mod noise;
pub mod single;
pub mod sweep;

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;

use crate::cli::RemoteArgs;
use crate::config::SweepConfig;
use crate::core::animation::LocalAnimationState;
use crate::core::remote::RemoteSimulator;
use crate::core::render::TerminalRenderer;
use crate::runner::{SweepReport, SweepRunner};

/// Fold command-line overrides into the loaded config.
pub(crate) fn with_overrides(mut cfg: SweepConfig, remote: &RemoteArgs) -> Result<SweepConfig> {
    if let Some(endpoint) = &remote.endpoint {
        cfg.endpoint = endpoint.clone();
    }
    if let Some(ms) = remote.timeout_ms {
        cfg.request_timeout_ms = ms;
    }
    if let Some(speed) = remote.speed {
        cfg.speed = speed;
    }
    cfg.validate().context("invalid settings")?;
    Ok(cfg)
}

/// Single-threaded runtime: the runner, its frame driver and every request
/// share one cooperative context.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")
}

pub(crate) fn terminal_runner(cfg: &SweepConfig) -> Result<SweepRunner<TerminalRenderer>> {
    let backend = RemoteSimulator::new(cfg.endpoint.clone(), cfg.request_timeout())?;
    tracing::info!(endpoint = %backend.endpoint(), "using remote simulator");
    let animation = LocalAnimationState::new(cfg.animation_settings());
    Ok(SweepRunner::new(Arc::new(backend), animation, TerminalRenderer::new())
        .with_frame_interval(cfg.frame_interval()))
}

pub(crate) fn print_report(report: &SweepReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}", "History".bold());
    for entry in &report.history {
        println!("  {} {}", entry.recorded_at.format("%H:%M:%S").to_string().dimmed(), entry);
    }
    println!("  {}", report.banner.label());
    Ok(())
}
