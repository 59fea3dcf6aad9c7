//! Local channel noise model.
//!
//! This is the cheap stand-in the animation samples from. The authoritative
//! QBER always comes from the remote simulator.

use serde::Serialize;

/// Noise added per km of fibre.
pub const NOISE_PER_KM: f64 = 0.002;
/// Ceiling on the distance term, applied before the eavesdropper addend.
pub const DISTANCE_NOISE_CAP: f64 = 0.25;
/// Extra noise an intercept-resend eavesdropper introduces.
pub const EAVESDROPPER_NOISE: f64 = 0.05;
/// Canonical BB84 QBER security threshold.
pub const SECURITY_THRESHOLD: f64 = 0.11;
/// Upper bound of [`noise_probability`] (cap + eavesdropper addend).
pub const MAX_NOISE: f64 = DISTANCE_NOISE_CAP + EAVESDROPPER_NOISE;

/// Probability that a single particle is disturbed on a link of `distance` km.
///
/// `base = min(distance * 0.002, 0.25)`, plus 0.05 with an eavesdropper, then
/// divided by `repeaters + 1` when at least one repeater is present.
/// Negative or non-finite distances count as 0.
pub fn noise_probability(distance: f64, repeaters: u32, eavesdropper: bool) -> f64 {
    let distance = if distance.is_finite() && distance > 0.0 { distance } else { 0.0 };
    let mut p = (distance * NOISE_PER_KM).min(DISTANCE_NOISE_CAP);
    if eavesdropper {
        p += EAVESDROPPER_NOISE;
    }
    if repeaters > 0 {
        p /= f64::from(repeaters) + 1.0;
    }
    p
}

/// Colour class of the topology link.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LinkQuality {
    Good,
    Degraded,
    Insecure,
}

impl LinkQuality {
    pub fn classify(noise: f64) -> Self {
        if noise < 0.05 {
            LinkQuality::Good
        } else if noise < SECURITY_THRESHOLD {
            LinkQuality::Degraded
        } else {
            LinkQuality::Insecure
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LinkQuality::Good => "good",
            LinkQuality::Degraded => "degraded",
            LinkQuality::Insecure => "insecure",
        }
    }
}
