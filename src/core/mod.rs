pub mod aggregator;
pub mod animation;
pub mod error;
pub mod export;
pub mod noise;
pub mod orchestrator;
pub mod remote;
pub mod render;

pub use aggregator::{BannerState, HistoryEntry, ResultAggregator, SweepPoint};
pub use animation::{AnimationSettings, LocalAnimationState, Particle, WrapPolicy};
pub use error::SweepError;
pub use noise::{noise_probability, LinkQuality, SECURITY_THRESHOLD};
pub use orchestrator::{
    CompareKind, PointPhase, RequestTag, RunMode, SessionId, SweepAction, SweepEvent, SweepOrchestrator, SweepPlan,
    SweepSession, SweepState,
};
pub use remote::{RemoteSimulator, SimulationBackend, SimulationRequest, SimulationResult};
pub use render::{Renderer, TerminalRenderer};
