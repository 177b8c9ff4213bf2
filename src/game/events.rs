//! Discrete events emitted by the simulation

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tank::{TankId, UpgradeKind};

/// Game events (shots, damage, turn flow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Projectile launched
    Fired {
        tank: TankId,
        x: f32,
        y: f32,
        angle: f32,
        velocity: f32,
    },

    /// Projectile detonated and carved the terrain
    Explosion { x: f32, y: f32, radius: f32 },

    /// Blast damage landed on a tank
    TankDamaged {
        tank: TankId,
        shooter: TankId,
        amount: f32,
        remaining_health: f32,
    },

    /// Tank health reached zero
    TankDestroyed { tank: TankId },

    /// Active tank changed
    TurnChanged { active: TankId },

    /// Wind was resampled
    WindChanged { speed: f32 },

    TankMoved { tank: TankId, x: f32, fuel: f32 },

    UpgradePurchased {
        tank: TankId,
        kind: UpgradeKind,
        level: u8,
        cost: u32,
    },

    AiToggled { enabled: bool },

    /// Match ended; `winner` is `None` for a draw
    MatchOver { winner: Option<TankId> },

    /// New round started
    MatchReset,
}

/// Audio collaborator. Fire-and-forget; nothing flows back into the core.
pub trait AudioSink {
    fn on_fire(&mut self, tank: TankId);
    fn on_explosion(&mut self, x: f32, y: f32);
    fn on_wind_change(&mut self, speed: f32);
}

/// Forward the audible subset of `events` to `sink`
pub fn dispatch_audio<S: AudioSink + ?Sized>(events: &[GameEvent], sink: &mut S) {
    for event in events {
        match event {
            GameEvent::Fired { tank, .. } => sink.on_fire(*tank),
            GameEvent::Explosion { x, y, .. } => sink.on_explosion(*x, *y),
            GameEvent::WindChanged { speed } => sink.on_wind_change(*speed),
            _ => {}
        }
    }
}

/// Audio sink that only logs, for headless runs
#[derive(Debug, Default)]
pub struct LoggingAudio;

impl AudioSink for LoggingAudio {
    fn on_fire(&mut self, tank: TankId) {
        debug!(tank = %tank, "sound: fire");
    }

    fn on_explosion(&mut self, x: f32, y: f32) {
        debug!(x, y, "sound: explosion");
    }

    fn on_wind_change(&mut self, speed: f32) {
        debug!(speed, "sound: wind");
    }
}
