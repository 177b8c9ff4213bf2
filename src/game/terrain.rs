//! Destructible terrain heightmap

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Terrain generation and geometry parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSettings {
    /// World width; samples span `[0, world_width)`
    pub world_width: f32,
    /// World height, used to flip heights into screen-y
    pub world_height: f32,
    /// Horizontal spacing between samples
    pub resolution: f32,
    /// Upper bound on any sample height
    pub max_height: f32,
    /// Number of rocks scattered on the surface
    pub obstacle_count: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            world_width: 800.0,
            world_height: 600.0,
            resolution: 5.0,
            max_height: 400.0,
            obstacle_count: 20,
        }
    }
}

impl TerrainSettings {
    /// Number of samples a field generated with these settings holds
    pub fn sample_count(&self) -> usize {
        (self.world_width / self.resolution).ceil().max(0.0) as usize
    }
}

/// One point of the ground profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    pub x: f32,
    pub height: f32,
}

/// A rock anchored to the surface at `x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub size: f32,
}

/// Rejected terrain data (only reachable through persisted snapshots)
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TerrainError {
    #[error("expected {expected} terrain samples, found {found}")]
    SampleCount { expected: usize, found: usize },

    #[error("terrain sample {index} is at x={found}, expected x={expected}")]
    Spacing {
        index: usize,
        expected: f32,
        found: f32,
    },

    #[error("terrain sample {index} has height {height} outside [0, {max}]")]
    Height { index: usize, height: f32, max: f32 },

    #[error("obstacle {index} is malformed")]
    Obstacle { index: usize },
}

/// Sampled heightmap plus surface rocks.
///
/// Samples sit at fixed spacing starting at x=0 and the count never changes
/// after generation; only [`TerrainField::carve`] lowers heights.
#[derive(Debug, Clone)]
pub struct TerrainField {
    settings: TerrainSettings,
    samples: Vec<TerrainSample>,
    obstacles: Vec<Obstacle>,
}

impl TerrainField {
    /// Generate a new profile with a biased random walk.
    ///
    /// Each step either continues a plateau, starts a new one with a larger
    /// jump (clamped to [50, 250]), or nudges the height by up to ±5.
    pub fn generate<R: Rng + ?Sized>(settings: TerrainSettings, rng: &mut R) -> Self {
        let count = settings.sample_count();
        let mut samples = Vec::with_capacity(count);

        let mut height: f32 = rng.gen_range(100.0..150.0);
        let mut plateau_length = 0u32;

        for i in 0..count {
            if plateau_length > 0 {
                plateau_length -= 1;
            } else if rng.gen_bool(0.1) {
                height = (height + rng.gen_range(-20.0..20.0)).clamp(50.0, 250.0);
                plateau_length = rng.gen_range(0..10);
            } else {
                height += rng.gen_range(-5.0..5.0);
            }
            height = height.clamp(0.0, settings.max_height);

            samples.push(TerrainSample {
                x: i as f32 * settings.resolution,
                height,
            });
        }

        let obstacles = (0..settings.obstacle_count)
            .map(|_| Obstacle {
                x: rng.gen_range(0.0..settings.world_width),
                size: rng.gen_range(2.0..6.0),
            })
            .collect();

        debug!(samples = samples.len(), "Terrain generated");

        Self {
            settings,
            samples,
            obstacles,
        }
    }

    /// Rebuild a field from persisted data, validating every invariant
    pub fn from_parts(
        settings: TerrainSettings,
        samples: Vec<TerrainSample>,
        obstacles: Vec<Obstacle>,
    ) -> Result<Self, TerrainError> {
        let expected = settings.sample_count();
        if samples.len() != expected {
            return Err(TerrainError::SampleCount {
                expected,
                found: samples.len(),
            });
        }

        for (index, sample) in samples.iter().enumerate() {
            let expected_x = index as f32 * settings.resolution;
            if !sample.x.is_finite() || (sample.x - expected_x).abs() > 1e-3 {
                return Err(TerrainError::Spacing {
                    index,
                    expected: expected_x,
                    found: sample.x,
                });
            }
            if !sample.height.is_finite()
                || sample.height < 0.0
                || sample.height > settings.max_height
            {
                return Err(TerrainError::Height {
                    index,
                    height: sample.height,
                    max: settings.max_height,
                });
            }
        }

        for (index, rock) in obstacles.iter().enumerate() {
            if !rock.x.is_finite() || !rock.size.is_finite() || rock.size < 0.0 {
                return Err(TerrainError::Obstacle { index });
            }
        }

        Ok(Self {
            settings,
            samples,
            obstacles,
        })
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn samples(&self) -> &[TerrainSample] {
        &self.samples
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn world_width(&self) -> f32 {
        self.settings.world_width
    }

    pub fn world_height(&self) -> f32 {
        self.settings.world_height
    }

    /// Ground height at `x`, linearly interpolated between samples.
    /// Outside the sampled range the nearest boundary sample is used.
    pub fn height_at(&self, x: f32) -> f32 {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };

        if x.is_nan() || x <= first.x {
            return first.height;
        }
        if x >= last.x {
            return last.height;
        }

        let left = (((x - first.x) / self.settings.resolution).floor() as usize)
            .min(self.samples.len() - 2);
        let a = self.samples[left];
        let b = self.samples[left + 1];
        let t = ((x - a.x) / (b.x - a.x)).clamp(0.0, 1.0);
        a.height * (1.0 - t) + b.height * t
    }

    /// Screen-space y of the ground surface at `x` (y grows downward)
    pub fn surface_y(&self, x: f32) -> f32 {
        self.settings.world_height - self.height_at(x)
    }

    /// Blast a crater centred on screen point `(x, y)`.
    ///
    /// Each sample within `radius` drops by `(radius - distance) / 2`, never
    /// below zero. Rocks strictly inside the radius are destroyed.
    pub fn carve(&mut self, x: f32, y: f32, radius: f32) {
        let world_height = self.settings.world_height;
        let mut lowered = 0usize;

        for sample in &mut self.samples {
            let dx = sample.x - x;
            let dy = (world_height - sample.height) - y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < radius {
                sample.height = (sample.height - (radius - distance) / 2.0).max(0.0);
                lowered += 1;
            }
        }

        let before = self.obstacles.len();
        let obstacles = std::mem::take(&mut self.obstacles);
        self.obstacles = obstacles
            .into_iter()
            .filter(|rock| {
                let dx = rock.x - x;
                let dy = self.surface_y(rock.x) - y;
                (dx * dx + dy * dy).sqrt() >= radius
            })
            .collect();

        debug!(
            x,
            y,
            radius,
            lowered,
            rocks_destroyed = before - self.obstacles.len(),
            "Terrain carved"
        );
    }

    /// Slope of the surface around `x` in degrees (positive when rising to the right)
    pub fn slope_degrees(&self, x: f32) -> f32 {
        let step = self.settings.resolution;
        let rise = self.height_at(x + step) - self.height_at(x - step);
        rise.atan2(2.0 * step).to_degrees()
    }
}
