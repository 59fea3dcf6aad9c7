//! Sweep orchestration as an explicit state machine.
//!
//! The orchestrator never performs I/O. The runner feeds it [`SweepEvent`]s
//! and executes the [`SweepAction`]s it returns:
//!
//! ```text
//! IDLE ──Start──▶ RUNNING ──last point paced──▶ COMPLETE ──acknowledge──▶ IDLE
//!                   │  per point: Baseline → [Eavesdropper | Repeater] → record → Pacing
//!                   └──Network/Protocol error──▶ IDLE
//! ```
//!
//! Every request carries a [`RequestTag`]; a response whose tag does not match
//! the live session, point and phase is stale and is dropped untouched.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::aggregator::{BannerState, ResultAggregator, SweepPoint};
use crate::core::error::SweepError;
use crate::core::remote::{SimulationRequest, SimulationResult, DEFAULT_QUBITS};

pub const DEFAULT_PACING: Duration = Duration::from_millis(700);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self { SessionId(raw) }
    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RunMode {
    Baseline,
    Eavesdropper,
    Repeater,
}

/// What the second run of each point is compared against.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CompareKind {
    /// Same link with an eavesdropper present.
    Eavesdropper,
    /// Bare link (0 repeaters) first, then the configured repeater chain.
    Repeaters,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestTag {
    pub session: SessionId,
    pub index: usize,
    pub mode: RunMode,
}

/// A validated sweep configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepPlan {
    distances: Vec<f64>,
    repeaters: u32,
    compare: Option<CompareKind>,
    baseline_eve: bool,
    qubits: u32,
    pacing: Duration,
}

impl SweepPlan {
    /// `10, 20, ..., 100` km.
    pub fn default_distances() -> Vec<f64> {
        (1..=10).map(|k| f64::from(k) * 10.0).collect()
    }

    /// Multi-distance sweep. Baseline runs never include an eavesdropper;
    /// `comparison` adds an eavesdropper run per point.
    pub fn sweep(distances: Vec<f64>, repeaters: u32, comparison: bool) -> Result<Self, SweepError> {
        validate_distances(&distances)?;
        Ok(Self {
            distances,
            repeaters,
            compare: comparison.then_some(CompareKind::Eavesdropper),
            baseline_eve: false,
            qubits: DEFAULT_QUBITS,
            pacing: DEFAULT_PACING,
        })
    }

    /// Per point, one run over the bare link and one over `repeaters`
    /// repeaters. Both runs carry the same eavesdropper flag.
    pub fn repeater_comparison(distances: Vec<f64>, repeaters: u32, eavesdropper: bool) -> Result<Self, SweepError> {
        validate_distances(&distances)?;
        if repeaters == 0 {
            return Err(SweepError::configuration("repeater comparison needs at least one repeater"));
        }
        Ok(Self {
            distances,
            repeaters,
            compare: Some(CompareKind::Repeaters),
            baseline_eve: eavesdropper,
            qubits: DEFAULT_QUBITS,
            pacing: DEFAULT_PACING,
        })
    }

    /// One distance, one request, with the eavesdropper toggle applied to it.
    pub fn single(distance: f64, repeaters: u32, eavesdropper: bool) -> Result<Self, SweepError> {
        validate_distances(&[distance])?;
        Ok(Self {
            distances: vec![distance],
            repeaters,
            compare: None,
            baseline_eve: eavesdropper,
            qubits: DEFAULT_QUBITS,
            pacing: DEFAULT_PACING,
        })
    }

    pub fn with_qubits(mut self, qubits: u32) -> Result<Self, SweepError> {
        if qubits == 0 {
            return Err(SweepError::configuration("qubits must be greater than 0"));
        }
        self.qubits = qubits;
        Ok(self)
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn distances(&self) -> &[f64] { &self.distances }
    pub fn repeaters(&self) -> u32 { self.repeaters }
    pub fn comparison(&self) -> bool { self.compare.is_some() }
    pub fn compare_kind(&self) -> Option<CompareKind> { self.compare }
    pub fn baseline_eve(&self) -> bool { self.baseline_eve }
    pub fn qubits(&self) -> u32 { self.qubits }
    pub fn pacing(&self) -> Duration { self.pacing }

    fn request(&self, index: usize, mode: RunMode) -> SimulationRequest {
        let (repeaters, eve) = match mode {
            RunMode::Baseline if self.compare == Some(CompareKind::Repeaters) => (0, self.baseline_eve),
            RunMode::Baseline => (self.repeaters, self.baseline_eve),
            RunMode::Eavesdropper => (self.repeaters, true),
            RunMode::Repeater => (self.repeaters, self.baseline_eve),
        };
        SimulationRequest { qubits: self.qubits, distance: self.distances[index], repeaters, eve }
    }
}

fn validate_distances(distances: &[f64]) -> Result<(), SweepError> {
    if distances.is_empty() {
        return Err(SweepError::configuration("distance list is empty"));
    }
    for (i, d) in distances.iter().enumerate() {
        if !d.is_finite() || *d < 0.0 {
            return Err(SweepError::configuration(format!("distance {d} must be a finite value >= 0")));
        }
        if distances[..i].contains(d) {
            return Err(SweepError::configuration(format!("distance {d} listed twice")));
        }
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PointPhase {
    /// Waiting on the first run of the point.
    Baseline,
    /// Waiting on the eavesdropper run; only entered in comparison mode.
    Eavesdropper,
    /// Waiting on the repeater-chain run of a repeater comparison.
    Repeater,
    /// Point recorded, waiting out the pacing delay.
    Pacing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SweepState {
    Idle,
    Running { index: usize, phase: PointPhase },
    Complete,
}

#[derive(Debug, Clone)]
pub enum SweepEvent {
    Start(SweepPlan),
    Response { tag: RequestTag, outcome: Result<SimulationResult, SweepError> },
    PacingElapsed { session: SessionId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepAction {
    /// A fresh session replaced whatever was shown before.
    SessionReset { session: SessionId },
    ConfigureAnimation { distance: f64, repeaters: u32, eavesdropper: bool },
    Issue { tag: RequestTag, request: SimulationRequest },
    /// Single-value displays and banner changed.
    ReadingUpdated { session: SessionId, banner: BannerState },
    PointRecorded { session: SessionId, point: SweepPoint },
    SchedulePacing { session: SessionId, delay: Duration },
    StopAnimation,
    Completed { session: SessionId },
    Failed { session: SessionId, error: SweepError },
}

/// One sweep run. Owns its aggregator outright; a new run gets a new session.
#[derive(Debug, Clone)]
pub struct SweepSession {
    id: SessionId,
    plan: SweepPlan,
    aggregator: ResultAggregator,
    pending: Option<SweepPoint>,
    /// Baseline reading of the pending point; shown once the point is recorded.
    pending_reading: Option<SimulationResult>,
}

impl SweepSession {
    fn new(id: SessionId, plan: SweepPlan) -> Self {
        let aggregator = ResultAggregator::new(plan.distances.clone());
        Self { id, plan, aggregator, pending: None, pending_reading: None }
    }

    pub fn id(&self) -> SessionId { self.id }
    pub fn plan(&self) -> &SweepPlan { &self.plan }
    pub fn aggregator(&self) -> &ResultAggregator { &self.aggregator }
}

#[derive(Debug)]
pub struct SweepOrchestrator {
    state: SweepState,
    session: Option<SweepSession>,
    next_session: u64,
    stale_discarded: u64,
}

impl Default for SweepOrchestrator {
    fn default() -> Self { Self::new() }
}

impl SweepOrchestrator {
    pub fn new() -> Self {
        Self { state: SweepState::Idle, session: None, next_session: 1, stale_discarded: 0 }
    }

    pub fn state(&self) -> SweepState { self.state }
    /// The current (or most recent) session. Kept after a failure so its
    /// points stay visible.
    pub fn session(&self) -> Option<&SweepSession> { self.session.as_ref() }
    pub fn stale_discarded(&self) -> u64 { self.stale_discarded }

    /// COMPLETE → IDLE once the caller has reported completion.
    pub fn acknowledge(&mut self) {
        if self.state == SweepState::Complete {
            self.state = SweepState::Idle;
        }
    }

    pub fn handle(&mut self, event: SweepEvent) -> Vec<SweepAction> {
        match event {
            SweepEvent::Start(plan) => self.start(plan),
            SweepEvent::Response { tag, outcome } => self.on_response(tag, outcome),
            SweepEvent::PacingElapsed { session } => self.on_pacing(session),
        }
    }

    fn start(&mut self, plan: SweepPlan) -> Vec<SweepAction> {
        if let (SweepState::Running { index, .. }, Some(old)) = (self.state, &self.session) {
            info!(session = %old.id, at_point = index, "superseding running sweep");
        }
        let id = SessionId(self.next_session);
        self.next_session += 1;
        info!(session = %id, points = plan.distances.len(), compare = ?plan.compare, "sweep started");
        // Replacing the session drops the previous aggregator before anything
        // can be appended to the new one.
        self.session = Some(SweepSession::new(id, plan));
        self.state = SweepState::Running { index: 0, phase: PointPhase::Baseline };
        let mut actions = vec![SweepAction::SessionReset { session: id }];
        actions.extend(self.begin_point(0));
        actions
    }

    fn begin_point(&self, index: usize) -> Vec<SweepAction> {
        let Some(session) = &self.session else { return Vec::new() };
        let plan = &session.plan;
        vec![
            SweepAction::ConfigureAnimation {
                distance: plan.distances[index],
                repeaters: plan.repeaters,
                eavesdropper: plan.baseline_eve,
            },
            SweepAction::Issue {
                tag: RequestTag { session: session.id, index, mode: RunMode::Baseline },
                request: plan.request(index, RunMode::Baseline),
            },
        ]
    }

    fn is_live(&self, tag: &RequestTag) -> bool {
        let SweepState::Running { index, phase } = self.state else { return false };
        let expected_phase = match tag.mode {
            RunMode::Baseline => PointPhase::Baseline,
            RunMode::Eavesdropper => PointPhase::Eavesdropper,
            RunMode::Repeater => PointPhase::Repeater,
        };
        self.session.as_ref().is_some_and(|s| s.id == tag.session) && index == tag.index && phase == expected_phase
    }

    fn on_response(&mut self, tag: RequestTag, outcome: Result<SimulationResult, SweepError>) -> Vec<SweepAction> {
        if !self.is_live(&tag) {
            self.stale_discarded += 1;
            debug!(error = %SweepError::StaleResponse(tag.session), ?tag, "discarding response");
            return Vec::new();
        }
        let result = match outcome {
            Ok(r) => r,
            Err(e) => return self.fail(e),
        };
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        let id = session.id;
        match tag.mode {
            RunMode::Baseline => {
                session.pending = Some(SweepPoint {
                    distance: session.plan.distances[tag.index],
                    qber_normal: result.qber,
                    qber_eve: None,
                    qber_repeater: None,
                });
                session.pending_reading = Some(result);
                let compare = session.plan.compare;
                let (mode, phase) = match compare {
                    None => return self.record(tag.index),
                    Some(CompareKind::Eavesdropper) => (RunMode::Eavesdropper, PointPhase::Eavesdropper),
                    Some(CompareKind::Repeaters) => (RunMode::Repeater, PointPhase::Repeater),
                };
                let request = session.plan.request(tag.index, mode);
                self.state = SweepState::Running { index: tag.index, phase };
                vec![SweepAction::Issue { tag: RequestTag { session: id, index: tag.index, mode }, request }]
            }
            RunMode::Eavesdropper | RunMode::Repeater => {
                if let Some(p) = session.pending.as_mut() {
                    if tag.mode == RunMode::Eavesdropper {
                        p.qber_eve = Some(result.qber);
                    } else {
                        p.qber_repeater = Some(result.qber);
                    }
                }
                self.record(tag.index)
            }
        }
    }

    fn record(&mut self, index: usize) -> Vec<SweepAction> {
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        let Some(point) = session.pending.take() else { return Vec::new() };
        let reading = session.pending_reading.take();
        if let Err(e) = session.aggregator.append(point.clone()) {
            return self.fail(e);
        }
        debug!(session = %session.id, distance = point.distance, qber = point.qber_normal, "point recorded");
        self.state = SweepState::Running { index, phase: PointPhase::Pacing };
        let mut actions = Vec::with_capacity(3);
        if let Some(reading) = reading {
            session.aggregator.observe(&reading);
            actions.push(SweepAction::ReadingUpdated { session: session.id, banner: session.aggregator.banner() });
        }
        actions.push(SweepAction::PointRecorded { session: session.id, point });
        actions.push(SweepAction::SchedulePacing { session: session.id, delay: session.plan.pacing });
        actions
    }

    fn on_pacing(&mut self, session: SessionId) -> Vec<SweepAction> {
        let SweepState::Running { index, phase: PointPhase::Pacing } = self.state else {
            debug!(%session, "pacing tick outside pacing phase");
            return Vec::new();
        };
        let Some(current) = &self.session else { return Vec::new() };
        if current.id != session {
            debug!(%session, "pacing tick for superseded session");
            return Vec::new();
        }
        let next = index + 1;
        if next >= current.plan.distances.len() {
            info!(session = %current.id, points = current.aggregator.points().len(), "sweep complete");
            self.state = SweepState::Complete;
            return vec![SweepAction::StopAnimation, SweepAction::Completed { session }];
        }
        self.state = SweepState::Running { index: next, phase: PointPhase::Baseline };
        self.begin_point(next)
    }

    fn fail(&mut self, error: SweepError) -> Vec<SweepAction> {
        self.state = SweepState::Idle;
        let Some(session) = self.session.as_mut() else { return Vec::new() };
        session.pending = None;
        session.pending_reading = None;
        warn!(session = %session.id, %error, "sweep aborted");
        vec![SweepAction::StopAnimation, SweepAction::Failed { session: session.id, error }]
    }
}
