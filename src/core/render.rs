//! Presentation seam. The core only ever talks to a [`Renderer`].
use colored::Colorize;

use crate::core::aggregator::{BannerState, SweepPoint};
use crate::core::error::SweepError;
use crate::core::noise::LinkQuality;
use crate::core::remote::SimulationResult;

pub trait Renderer {
    fn update_series(&mut self, points: &[SweepPoint]);
    fn update_topology(&mut self, noise_level: f64);
    fn update_banner(&mut self, state: BannerState);

    /// Latest single-run reading (key length, fidelity, detection flag...).
    fn update_reading(&mut self, _reading: &SimulationResult) {}
    /// Live error rate of the particle view, or `None` with no particles.
    fn update_live_rate(&mut self, _rate: Option<f64>, _alarm: bool) {}
    /// The one user-visible notification for an aborted sweep.
    fn notify_error(&mut self, _error: &SweepError) {}
}

/// Line-oriented renderer for the CLI.
#[derive(Default)]
pub struct TerminalRenderer {
    shown_points: usize,
    last_quality: Option<LinkQuality>,
    alarm_shown: bool,
}

impl TerminalRenderer {
    pub fn new() -> Self { Self::default() }
}

fn fmt_qber(q: f64) -> String { format!("{q:.3}") }

impl Renderer for TerminalRenderer {
    fn update_series(&mut self, points: &[SweepPoint]) {
        if points.is_empty() || points.len() < self.shown_points {
            // new session
            self.shown_points = 0;
            self.alarm_shown = false;
        }
        for p in &points[self.shown_points..] {
            let (label, second) = match p.qber_repeater {
                Some(rep) => ("QBER(repeaters)", fmt_qber(rep)),
                None => ("QBER(eve)", p.qber_eve.map(fmt_qber).unwrap_or_else(|| "-".into())),
            };
            println!(
                "{} {:>7} km  {} {}  {} {}",
                "●".truecolor(130, 0, 200),
                p.distance,
                "QBER".bold(),
                fmt_qber(p.qber_normal),
                label.bold(),
                second
            );
        }
        self.shown_points = points.len();
    }

    fn update_topology(&mut self, noise_level: f64) {
        let quality = LinkQuality::classify(noise_level);
        if self.last_quality == Some(quality) {
            return;
        }
        self.last_quality = Some(quality);
        let label = match quality {
            LinkQuality::Good => quality.label().green(),
            LinkQuality::Degraded => quality.label().yellow(),
            LinkQuality::Insecure => quality.label().red(),
        };
        println!("  link {label} (noise {noise_level:.3})");
    }

    fn update_banner(&mut self, state: BannerState) {
        let text = match state {
            BannerState::Secure => state.label().green().bold(),
            BannerState::Compromised => state.label().red().bold(),
            BannerState::Unknown => state.label().dimmed(),
        };
        println!("  {text}");
    }

    fn update_reading(&mut self, r: &SimulationResult) {
        let detected = if r.eve_detected { "Detected".red() } else { "Not Detected".green() };
        println!(
            "  key {}  fidelity {}  key rate {}  loss {}  eve {}",
            r.final_key_length, r.fidelity, r.key_rate, r.channel_loss, detected
        );
    }

    fn update_live_rate(&mut self, rate: Option<f64>, alarm: bool) {
        if alarm && !self.alarm_shown {
            if let Some(rate) = rate {
                println!("  {} live error rate {rate:.3} above threshold", "⚠".yellow().bold());
            }
            self.alarm_shown = true;
        }
    }

    fn notify_error(&mut self, error: &SweepError) {
        eprintln!("{} {}", "err:".red().bold(), error);
    }
}
