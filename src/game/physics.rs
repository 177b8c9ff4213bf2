//! Projectile ballistics and tank roll physics

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::tank::TankId;
use super::terrain::TerrainField;

/// Ballistics constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticsStats {
    /// Downward acceleration
    pub gravity: f32,
    /// Simulation time advanced per frame
    pub dt: f32,
    /// Number of trail points kept for rendering
    pub trail_capacity: usize,
    /// Spawn height above the ground at the tank's x
    pub turret_height: f32,
}

impl Default for BallisticsStats {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            dt: crate::util::time::SIMULATION_DT,
            trail_capacity: 20,
            turret_height: 20.0,
        }
    }
}

/// A past projectile position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
}

/// The shell in flight. Positions are screen-space (y grows downward).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub owner: TankId,
    pub x: f32,
    pub y: f32,
    /// Launch direction in degrees (0 = right, 90 = up)
    pub angle: f32,
    pub velocity: f32,
    pub elapsed: f32,
    pub trail: VecDeque<TrailPoint>,
}

impl Projectile {
    pub fn new(owner: TankId, x: f32, y: f32, angle: f32, power: f32) -> Self {
        Self {
            owner,
            x,
            y,
            angle,
            velocity: PhysicsSystem::muzzle_velocity(power),
            elapsed: 0.0,
            trail: VecDeque::new(),
        }
    }
}

/// Physics system for projectile flight and tank tilt
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Launch speed for a given power setting (linear: 200..1000 -> 10..50)
    pub fn muzzle_velocity(power: f32) -> f32 {
        power / 20.0
    }

    /// Advance a projectile by one frame.
    ///
    /// `elapsed` is advanced before it feeds the gravity term.
    pub fn step(projectile: &Projectile, wind_speed: f32, stats: &BallisticsStats) -> Projectile {
        let dt = stats.dt;
        let radians = projectile.angle.to_radians();
        let elapsed = projectile.elapsed + dt;

        let x = projectile.x + projectile.velocity * radians.cos() * dt + wind_speed * dt;
        let y = projectile.y
            - (projectile.velocity * radians.sin() - 0.5 * stats.gravity * elapsed) * dt;

        let mut trail = projectile.trail.clone();
        trail.push_back(TrailPoint { x, y });
        while trail.len() > stats.trail_capacity {
            trail.pop_front();
        }

        Projectile {
            owner: projectile.owner,
            x,
            y,
            angle: projectile.angle,
            velocity: projectile.velocity,
            elapsed,
            trail,
        }
    }

    /// Whether the projectile has hit the ground or left the world sideways
    pub fn has_impacted(projectile: &Projectile, terrain: &TerrainField) -> bool {
        projectile.x < 0.0
            || projectile.x > terrain.world_width()
            || projectile.y > terrain.surface_y(projectile.x)
    }

    /// Roll angle a tank takes on when parked at `x`
    pub fn slope_roll(terrain: &TerrainField, x: f32) -> f32 {
        // screen rotation is clockwise-positive, so a rising slope tilts negative
        -terrain.slope_degrees(x)
    }

    /// Exponential decay of the roll angle toward level
    pub fn damp_roll(roll: f32) -> f32 {
        let damped = roll * 0.9;
        if damped.abs() < 0.1 {
            0.0
        } else {
            damped
        }
    }

    pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        (dx * dx + dy * dy).sqrt()
    }
}
