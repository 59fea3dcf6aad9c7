//! Cooperative driver for the sweep state machine.
//!
//! Everything runs on one task: orchestrator events, the frame driver and the
//! pacing timer are multiplexed with `tokio::select!`. Remote calls are spawned
//! and report back over a channel tagged with the session that issued them, so
//! a call from a superseded sweep can finish at any time without harm.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::core::aggregator::{BannerState, HistoryEntry, SweepPoint};
use crate::core::animation::LocalAnimationState;
use crate::core::error::SweepError;
use crate::core::orchestrator::{
    RequestTag, SessionId, SweepAction, SweepEvent, SweepOrchestrator, SweepPlan, SweepState,
};
use crate::core::remote::{SimulationBackend, SimulationResult};
use crate::core::render::Renderer;

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

type Delivery = (RequestTag, Result<SimulationResult, SweepError>);

/// Snapshot of a session, as shown to the user and written by `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub session: SessionId,
    pub points: Vec<SweepPoint>,
    pub history: Vec<HistoryEntry>,
    pub banner: BannerState,
    pub latest: Option<SimulationResult>,
    pub stale_discarded: u64,
}

enum Outcome {
    Completed(SessionId),
    Failed(SessionId, SweepError),
}

pub struct SweepRunner<R: Renderer> {
    orchestrator: SweepOrchestrator,
    animation: LocalAnimationState,
    backend: Arc<dyn SimulationBackend>,
    renderer: R,
    frame_interval: Duration,
    tx: mpsc::UnboundedSender<Delivery>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    pacing: Option<(SessionId, Instant)>,
    outcome: Option<Outcome>,
}

impl<R: Renderer> SweepRunner<R> {
    pub fn new(backend: Arc<dyn SimulationBackend>, animation: LocalAnimationState, renderer: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            orchestrator: SweepOrchestrator::new(),
            animation,
            backend,
            renderer,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            tx,
            rx,
            pacing: None,
            outcome: None,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn orchestrator(&self) -> &SweepOrchestrator { &self.orchestrator }
    pub fn animation(&self) -> &LocalAnimationState { &self.animation }
    pub fn renderer(&self) -> &R { &self.renderer }
    pub fn renderer_mut(&mut self) -> &mut R { &mut self.renderer }

    /// Start (or restart) a sweep. Must be called from within a tokio runtime.
    pub fn start(&mut self, plan: SweepPlan) -> Option<SessionId> {
        self.pacing = None;
        self.outcome = None;
        let actions = self.orchestrator.handle(SweepEvent::Start(plan));
        self.apply(actions);
        self.orchestrator.session().map(|s| s.id())
    }

    pub async fn run(&mut self, plan: SweepPlan) -> Result<SweepReport, SweepError> {
        self.start(plan);
        self.drive().await
    }

    /// Drive the current session until it completes or fails.
    pub async fn drive(&mut self) -> Result<SweepReport, SweepError> {
        let mut frames = time::interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_frame = Instant::now();

        loop {
            match self.outcome.take() {
                Some(Outcome::Completed(session)) => {
                    self.orchestrator.acknowledge();
                    info!(%session, "sweep finished");
                    return self.report().ok_or_else(|| SweepError::protocol("completed without a session"));
                }
                Some(Outcome::Failed(session, e)) => {
                    error!(%session, error = %e, "sweep failed");
                    return Err(e);
                }
                None => {}
            }
            if !matches!(self.orchestrator.state(), SweepState::Running { .. }) {
                return Err(SweepError::configuration("no sweep running"));
            }

            let pacing = self.pacing;
            tokio::select! {
                Some((tag, outcome)) = self.rx.recv() => {
                    let actions = self.orchestrator.handle(SweepEvent::Response { tag, outcome });
                    self.apply(actions);
                }
                _ = time::sleep_until(pacing.map(|(_, at)| at).unwrap_or_else(Instant::now)), if pacing.is_some() => {
                    self.pacing = None;
                    if let Some((session, _)) = pacing {
                        let actions = self.orchestrator.handle(SweepEvent::PacingElapsed { session });
                        self.apply(actions);
                    }
                }
                now = frames.tick() => {
                    let elapsed = now.saturating_duration_since(last_frame);
                    last_frame = now;
                    self.frame(elapsed);
                }
            }
        }
    }

    /// One display frame. A frame that fires after the animation was stopped
    /// only observes the cleared flag.
    fn frame(&mut self, elapsed: Duration) {
        if !self.animation.is_running() {
            return;
        }
        let frames = elapsed.as_secs_f64() / self.frame_interval.as_secs_f64();
        self.animation.tick(frames);
        self.renderer.update_topology(self.animation.noise_level());
        self.renderer.update_live_rate(self.animation.live_error_rate(), self.animation.alarm());
    }

    pub fn report(&self) -> Option<SweepReport> {
        let session = self.orchestrator.session()?;
        let agg = session.aggregator();
        Some(SweepReport {
            session: session.id(),
            points: agg.points().to_vec(),
            history: agg.history().to_vec(),
            banner: agg.banner(),
            latest: agg.latest().cloned(),
            stale_discarded: self.orchestrator.stale_discarded(),
        })
    }

    fn apply(&mut self, actions: Vec<SweepAction>) {
        for action in actions {
            match action {
                SweepAction::SessionReset { session } => {
                    debug!(%session, "session reset");
                    self.renderer.update_series(&[]);
                    self.renderer.update_banner(BannerState::Unknown);
                }
                SweepAction::ConfigureAnimation { distance, repeaters, eavesdropper } => {
                    self.animation.configure(distance, repeaters, eavesdropper);
                    self.animation.start();
                    self.renderer.update_topology(self.animation.noise_level());
                }
                SweepAction::Issue { tag, request } => {
                    debug!(?tag, distance = request.distance, eve = request.eve, "issuing request");
                    let backend = Arc::clone(&self.backend);
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let outcome = backend.simulate(&request).await;
                        // The receiver only goes away with the runner itself.
                        let _ = tx.send((tag, outcome));
                    });
                }
                SweepAction::ReadingUpdated { banner, .. } => {
                    if let Some(latest) = self.orchestrator.session().and_then(|s| s.aggregator().latest()) {
                        self.renderer.update_reading(latest);
                    }
                    self.renderer.update_banner(banner);
                }
                SweepAction::PointRecorded { .. } => {
                    if let Some(session) = self.orchestrator.session() {
                        self.renderer.update_series(session.aggregator().points());
                    }
                }
                SweepAction::SchedulePacing { session, delay } => {
                    self.pacing = Some((session, Instant::now() + delay));
                }
                SweepAction::StopAnimation => self.animation.stop(),
                SweepAction::Completed { session } => {
                    self.outcome = Some(Outcome::Completed(session));
                }
                SweepAction::Failed { session, error } => {
                    self.renderer.notify_error(&error);
                    self.outcome = Some(Outcome::Failed(session, error));
                }
            }
        }
    }
}
