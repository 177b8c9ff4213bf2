//! Read-only render snapshots

use serde::Serialize;

use super::physics::TrailPoint;
use super::r#match::{Match, MatchPhase};
use super::tank::TankId;
use super::terrain::{Obstacle, TerrainSample};

/// Coarse match status for the HUD
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchStatus {
    AwaitingInput { active: TankId, ai_thinking: bool },
    InFlight { active: TankId },
    Resolving,
    GameOver { winner: Option<TankId> },
}

/// Tank state in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct TankSnapshot {
    pub id: TankId,
    pub name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub x: f32,
    /// Ground height under the tank
    pub ground: f32,
    pub angle: f32,
    /// Barrel direction in world degrees
    pub barrel_angle: f32,
    pub power: f32,
    pub health: f32,
    pub max_health: f32,
    pub fuel: f32,
    pub max_fuel: f32,
    pub roll: f32,
    pub money: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileSnapshot {
    pub x: f32,
    pub y: f32,
    pub trail: Vec<TrailPoint>,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    pub world_width: f32,
    pub world_height: f32,
    pub terrain: Vec<TerrainSample>,
    pub obstacles: Vec<Obstacle>,
    pub tanks: Vec<TankSnapshot>,
    pub projectile: Option<ProjectileSnapshot>,
    pub wind: f32,
    pub status: MatchStatus,
}

/// Builds render snapshots at a fixed cadence
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to emit a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, game: &Match) -> RenderSnapshot {
        let terrain = game.terrain();
        let world_width = terrain.world_width();

        let tanks = game
            .tanks()
            .iter()
            .map(|t| TankSnapshot {
                id: t.id,
                name: t.team.name.clone(),
                primary_color: t.team.primary_color.clone(),
                secondary_color: t.team.secondary_color.clone(),
                x: t.x,
                ground: terrain.height_at(t.x),
                angle: t.angle,
                barrel_angle: t.barrel_angle(world_width),
                power: t.power,
                health: t.health,
                max_health: t.max_health,
                fuel: t.fuel,
                max_fuel: t.max_fuel,
                roll: t.roll,
                money: t.money,
            })
            .collect();

        let projectile = game.projectile().map(|p| ProjectileSnapshot {
            x: p.x,
            y: p.y,
            trail: p.trail.iter().copied().collect(),
        });

        let status = match game.phase() {
            MatchPhase::AwaitingInput => MatchStatus::AwaitingInput {
                active: game.active(),
                ai_thinking: game.ai_countdown().is_some(),
            },
            MatchPhase::InFlight(_) => MatchStatus::InFlight {
                active: game.active(),
            },
            MatchPhase::Resolving => MatchStatus::Resolving,
            MatchPhase::GameOver { winner } => MatchStatus::GameOver { winner: *winner },
        };

        RenderSnapshot {
            tick: game.tick_count(),
            world_width,
            world_height: terrain.world_height(),
            terrain: terrain.samples().to_vec(),
            obstacles: terrain.obstacles().to_vec(),
            tanks,
            projectile,
            wind: game.wind(),
            status,
        }
    }
}
