//! Particle animation state for the link view.
//!
//! Pure state: the runner's frame driver calls [`LocalAnimationState::tick`]
//! and the renderer reads particles back out. Nothing here touches a display.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::noise::{noise_probability, SECURITY_THRESHOLD};

/// What happens to a particle's noisy flag when it wraps around the track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapPolicy {
    /// Keep the flag sampled at creation.
    #[default]
    Retain,
    /// Draw a fresh flag from the current noise probability.
    Resample,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Particle {
    pub position: f64,
    pub noisy: bool,
    pub speed: f64,
}

#[derive(Clone, Debug)]
pub struct AnimationSettings {
    pub particle_count: usize,
    /// Track start (Alice) and end (Bob).
    pub near: f64,
    pub far: f64,
    /// Per-particle speed is drawn uniformly from `min_speed..=max_speed`.
    pub min_speed: f64,
    pub max_speed: f64,
    /// Global multiplier from the speed control.
    pub speed_multiplier: f64,
    pub wrap_policy: WrapPolicy,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            particle_count: 15,
            near: 80.0,
            far: 620.0,
            min_speed: 1.0,
            max_speed: 3.0,
            speed_multiplier: 1.0,
            wrap_policy: WrapPolicy::Retain,
        }
    }
}

pub struct LocalAnimationState {
    settings: AnimationSettings,
    particles: Vec<Particle>,
    noise: f64,
    running: bool,
    rng: StdRng,
}

impl LocalAnimationState {
    pub fn new(settings: AnimationSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Deterministic sampling, for tests and reproducible demos.
    pub fn seeded(settings: AnimationSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: AnimationSettings, rng: StdRng) -> Self {
        Self { settings, particles: Vec::new(), noise: 0.0, running: false, rng }
    }

    /// Drop the current particles and sample a new set for this link.
    pub fn configure(&mut self, distance: f64, repeaters: u32, eavesdropper: bool) {
        self.noise = noise_probability(distance, repeaters, eavesdropper);
        self.particles.clear();
        let (lo, hi) = self.speed_bounds();
        for _ in 0..self.settings.particle_count {
            let noisy = self.rng.gen_bool(self.noise);
            let speed = if hi > lo { self.rng.gen_range(lo..=hi) } else { lo };
            self.particles.push(Particle { position: self.settings.near, noisy, speed });
        }
    }

    /// Advance every particle by `speed * elapsed * multiplier`, wrapping at the far end.
    pub fn tick(&mut self, elapsed: f64) {
        let step = elapsed * self.settings.speed_multiplier;
        let (near, far) = (self.settings.near, self.settings.far);
        for p in &mut self.particles {
            p.position += p.speed * step;
            if p.position > far {
                p.position = near;
                if self.settings.wrap_policy == WrapPolicy::Resample {
                    p.noisy = self.rng.gen_bool(self.noise);
                }
            }
        }
    }

    /// Fraction of noisy particles; `None` when there is nothing to measure.
    pub fn live_error_rate(&self) -> Option<f64> {
        if self.particles.is_empty() {
            return None;
        }
        let noisy = self.particles.iter().filter(|p| p.noisy).count();
        Some(noisy as f64 / self.particles.len() as f64)
    }

    pub fn alarm(&self) -> bool {
        self.live_error_rate().is_some_and(exceeds_threshold)
    }

    pub fn particles(&self) -> &[Particle] { &self.particles }
    pub fn noise_level(&self) -> f64 { self.noise }
    pub fn settings(&self) -> &AnimationSettings { &self.settings }

    pub fn set_speed_multiplier(&mut self, multiplier: f64) {
        self.settings.speed_multiplier = multiplier;
    }

    pub fn start(&mut self) { self.running = true; }
    pub fn stop(&mut self) { self.running = false; }
    pub fn is_running(&self) -> bool { self.running }

    fn speed_bounds(&self) -> (f64, f64) {
        let lo = self.settings.min_speed;
        (lo, self.settings.max_speed.max(lo))
    }
}

/// Strictly above the BB84 threshold; exactly 0.11 is still secure.
pub fn exceeds_threshold(rate: f64) -> bool {
    rate > SECURITY_THRESHOLD
}
