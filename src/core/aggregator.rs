//! Series, history and banner state for one sweep session.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

use crate::core::error::SweepError;
use crate::core::export;
use crate::core::remote::SimulationResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub distance: f64,
    pub qber_normal: f64,
    /// Only present when the sweep ran in eavesdropper comparison mode.
    pub qber_eve: Option<f64>,
    /// QBER over the repeater chain; `qber_normal` is then the bare link.
    pub qber_repeater: Option<f64>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum BannerState {
    Secure,
    Compromised,
    #[default]
    Unknown,
}

impl BannerState {
    pub fn from_verdict(secure: bool) -> Self {
        if secure { BannerState::Secure } else { BannerState::Compromised }
    }

    pub fn label(self) -> &'static str {
        match self {
            BannerState::Secure => "Network Status: Secure",
            BannerState::Compromised => "Network Status: Compromised",
            BannerState::Unknown => "Network Status: Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub distance: f64,
    pub qber_normal: f64,
    pub qber_eve: Option<f64>,
    pub qber_repeater: Option<f64>,
    pub recorded_at: DateTime<Local>,
}

impl From<&SweepPoint> for HistoryEntry {
    fn from(p: &SweepPoint) -> Self {
        Self {
            distance: p.distance,
            qber_normal: p.qber_normal,
            qber_eve: p.qber_eve,
            qber_repeater: p.qber_repeater,
            recorded_at: Local::now(),
        }
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.qber_eve, self.qber_repeater) {
            (Some(eve), _) => write!(
                f,
                "Distance: {} km | QBER Normal: {} | QBER Eve: {}",
                self.distance, self.qber_normal, eve
            ),
            (None, Some(rep)) => write!(
                f,
                "Distance: {} km | QBER No Repeater: {} | QBER Repeater: {}",
                self.distance, self.qber_normal, rep
            ),
            (None, None) => write!(f, "Distance: {} km | QBER: {}", self.distance, self.qber_normal),
        }
    }
}

/// Owns everything one session shows: the ordered series, the history log,
/// the banner and the most recent single-run reading.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    plan: Vec<f64>,
    points: Vec<SweepPoint>,
    history: Vec<HistoryEntry>,
    banner: BannerState,
    latest: Option<SimulationResult>,
}

impl ResultAggregator {
    /// `plan` is the configured distance order that appends must follow.
    pub fn new(plan: Vec<f64>) -> Self {
        Self { plan, points: Vec::new(), history: Vec::new(), banner: BannerState::Unknown, latest: None }
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.history.clear();
        self.banner = BannerState::Unknown;
        self.latest = None;
    }

    /// Append the next point. Its distance must be the next one in the plan
    /// and must not already be in the series.
    pub fn append(&mut self, point: SweepPoint) -> Result<(), SweepError> {
        if self.points.iter().any(|p| p.distance == point.distance) {
            return Err(SweepError::DuplicateDistance(point.distance));
        }
        let expected = self.plan.get(self.points.len()).copied();
        if expected != Some(point.distance) {
            return Err(SweepError::OutOfOrder { expected, got: point.distance });
        }
        self.history.push(HistoryEntry::from(&point));
        self.points.push(point);
        Ok(())
    }

    /// Fold a run's verdict into the single-value displays and the banner.
    pub fn observe(&mut self, result: &SimulationResult) {
        self.banner = BannerState::from_verdict(result.secure);
        self.latest = Some(result.clone());
    }

    pub fn to_csv(&self) -> String { export::render_csv(&self.points) }

    pub fn points(&self) -> &[SweepPoint] { &self.points }
    pub fn history(&self) -> &[HistoryEntry] { &self.history }
    pub fn banner(&self) -> BannerState { self.banner }
    pub fn latest(&self) -> Option<&SimulationResult> { self.latest.as_ref() }
    pub fn plan(&self) -> &[f64] { &self.plan }
    pub fn is_complete(&self) -> bool { self.points.len() == self.plan.len() }
}
