//! Computer opponent aiming

use rand::Rng;

use super::tank::{Tank, MAX_ANGLE, MAX_POWER, MIN_ANGLE, MIN_POWER};
use super::terrain::TerrainField;

/// Below this separation the height term of the angle formula is dropped
const MIN_AIM_DISTANCE: f32 = 1e-3;

/// AI tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiStats {
    /// Power per unit of horizontal distance
    pub power_factor: f32,
    /// Half-width of the uniform angle jitter, degrees
    pub angle_jitter: f32,
    /// Half-width of the uniform power jitter
    pub power_jitter: f32,
}

impl Default for AiStats {
    fn default() -> Self {
        Self {
            power_factor: 2.0,
            angle_jitter: 5.0,
            power_jitter: 50.0,
        }
    }
}

/// Chosen elevation and power for one shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimDecision {
    pub angle: f32,
    pub power: f32,
}

pub struct AiOpponent;

impl AiOpponent {
    /// Pick the nearest living enemy of `shooter`
    pub fn pick_target<'a>(shooter: &Tank, tanks: &'a [Tank]) -> Option<&'a Tank> {
        tanks
            .iter()
            .filter(|t| t.id != shooter.id && t.is_alive())
            .min_by(|a, b| {
                let da = (a.x - shooter.x).abs();
                let db = (b.x - shooter.x).abs();
                da.total_cmp(&db)
            })
    }

    /// Aim at `target`: a 45 degree baseline tilted by the height difference,
    /// power proportional to distance, both with uniform jitter.
    pub fn decide<R: Rng + ?Sized>(
        shooter: &Tank,
        target: &Tank,
        terrain: &TerrainField,
        stats: &AiStats,
        rng: &mut R,
    ) -> AimDecision {
        let distance = (shooter.x - target.x).abs();
        let height_diff = terrain.height_at(shooter.x) - terrain.height_at(target.x);

        let tilt = if distance > MIN_AIM_DISTANCE {
            (height_diff / distance) * 45.0
        } else {
            0.0
        };

        let angle_jitter = Self::jitter(rng, stats.angle_jitter);
        let power_jitter = Self::jitter(rng, stats.power_jitter);

        AimDecision {
            angle: (45.0 + tilt + angle_jitter).clamp(MIN_ANGLE, MAX_ANGLE),
            power: (stats.power_factor * distance + power_jitter).clamp(MIN_POWER, MAX_POWER),
        }
    }

    fn jitter<R: Rng + ?Sized>(rng: &mut R, half_width: f32) -> f32 {
        if half_width > 0.0 {
            rng.gen_range(-half_width..=half_width)
        } else {
            0.0
        }
    }
}
