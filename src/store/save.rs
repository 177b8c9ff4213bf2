//! Persisted match snapshots

use chrono::{DateTime, Utc};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::physics::Projectile;
use crate::game::r#match::{Match, MatchParts, RoundConfig};
use crate::game::tank::{
    Controller, Tank, TankId, Team, TeamError, Upgrades, MAX_ANGLE, MAX_POWER, MIN_ANGLE, MIN_POWER,
};
use crate::game::terrain::{Obstacle, TerrainError, TerrainField, TerrainSample};

use super::slot::{SaveSlot, StoreError};

/// Current snapshot format
pub const SAVE_VERSION: u32 = 1;

/// Why a snapshot could not be applied
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LoadError {
    #[error("Unsupported save version {0}")]
    UnsupportedVersion(u32),

    #[error("Save lists {players} players but {tanks} tanks")]
    RosterMismatch { players: usize, tanks: usize },

    #[error("Save needs at least 2 tanks, found {0}")]
    TooFewTanks(usize),

    #[error("Invalid team for player {index}: {source}")]
    Team { index: usize, source: TeamError },

    #[error("Invalid upgrades for player {0}")]
    Upgrades(usize),

    #[error("Tank {index} has invalid {field}")]
    Tank { index: usize, field: &'static str },

    #[error("Active tank {0} is not in the roster")]
    ActiveTank(TankId),

    #[error("Invalid wind speed {0}")]
    Wind(f32),

    #[error("Projectile in flight has invalid {0}")]
    Projectile(&'static str),

    #[error("Invalid terrain: {0}")]
    Terrain(#[from] TerrainError),
}

/// Identity and economy of one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlayer {
    pub team: Team,
    pub controller: Controller,
    pub money: u32,
    pub upgrades: Upgrades,
}

/// Round-scoped tank stats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedTank {
    pub x: f32,
    pub spawn_x: f32,
    pub angle: f32,
    pub power: f32,
    pub health: f32,
    pub fuel: f32,
}

/// Everything needed to resume a match, including a shell in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub match_id: Uuid,
    pub saved_at: DateTime<Utc>,
    pub seed: u64,
    pub players: Vec<SavedPlayer>,
    pub tanks: Vec<SavedTank>,
    pub terrain: Vec<TerrainSample>,
    pub obstacles: Vec<Obstacle>,
    pub wind: f32,
    pub active_tank: TankId,
    pub ai_mode: bool,
    pub rng: ChaCha8Rng,
    #[serde(default)]
    pub projectile: Option<Projectile>,
}

impl SaveState {
    /// Snapshot the persistent parts of a match
    pub fn capture(game: &Match) -> Self {
        let players = game
            .tanks()
            .iter()
            .map(|t| SavedPlayer {
                team: t.team.clone(),
                controller: t.controller,
                money: t.money,
                upgrades: t.upgrades,
            })
            .collect();

        let tanks = game
            .tanks()
            .iter()
            .map(|t| SavedTank {
                x: t.x,
                spawn_x: t.spawn_x,
                angle: t.angle,
                power: t.power,
                health: t.health,
                fuel: t.fuel,
            })
            .collect();

        Self {
            version: SAVE_VERSION,
            match_id: game.id(),
            saved_at: Utc::now(),
            seed: game.seed(),
            players,
            tanks,
            terrain: game.terrain().samples().to_vec(),
            obstacles: game.terrain().obstacles().to_vec(),
            wind: game.wind(),
            active_tank: game.active(),
            ai_mode: game.ai_mode(),
            rng: game.rng().clone(),
            projectile: game.projectile().cloned(),
        }
    }

    /// Validate every field and build a fresh match. Nothing is applied
    /// unless the whole snapshot is consistent.
    pub fn into_match(self, config: RoundConfig) -> Result<Match, LoadError> {
        if self.version != SAVE_VERSION {
            return Err(LoadError::UnsupportedVersion(self.version));
        }
        if self.players.len() != self.tanks.len() {
            return Err(LoadError::RosterMismatch {
                players: self.players.len(),
                tanks: self.tanks.len(),
            });
        }
        if self.tanks.len() < 2 {
            return Err(LoadError::TooFewTanks(self.tanks.len()));
        }
        if self.active_tank.0 >= self.tanks.len() {
            return Err(LoadError::ActiveTank(self.active_tank));
        }
        if !self.wind.is_finite() || self.wind.abs() > config.max_wind_speed {
            return Err(LoadError::Wind(self.wind));
        }

        let terrain = TerrainField::from_parts(config.terrain, self.terrain, self.obstacles)?;

        let min_x = config.tank_margin;
        let max_x = config.terrain.world_width - config.tank_margin;
        let mut tanks = Vec::with_capacity(self.tanks.len());

        for (index, (player, saved)) in self.players.into_iter().zip(self.tanks).enumerate() {
            player
                .team
                .validate()
                .map_err(|source| LoadError::Team { index, source })?;
            if !player.upgrades.is_valid() {
                return Err(LoadError::Upgrades(index));
            }

            let max_fuel = Tank::max_fuel_for(&player.upgrades, &config.limits);
            let checks: [(&'static str, f32, f32, f32); 6] = [
                ("x", saved.x, min_x, max_x),
                ("spawn_x", saved.spawn_x, min_x, max_x),
                ("angle", saved.angle, MIN_ANGLE, MAX_ANGLE),
                ("power", saved.power, MIN_POWER, MAX_POWER),
                ("health", saved.health, 0.0, config.limits.max_health),
                ("fuel", saved.fuel, 0.0, max_fuel),
            ];
            for (field, value, low, high) in checks {
                if !value.is_finite() || value < low || value > high {
                    return Err(LoadError::Tank { index, field });
                }
            }

            let mut tank = Tank::new(
                TankId(index),
                player.team,
                player.controller,
                saved.spawn_x,
                &config.limits,
            );
            tank.x = saved.x;
            tank.angle = saved.angle;
            tank.power = saved.power;
            tank.health = saved.health;
            tank.max_fuel = max_fuel;
            tank.fuel = saved.fuel;
            tank.upgrades = player.upgrades;
            tank.money = player.money;
            tanks.push(tank);
        }

        let alive = tanks.iter().filter(|t| t.is_alive()).count();
        if alive > 1 && !tanks[self.active_tank.0].is_alive() {
            return Err(LoadError::ActiveTank(self.active_tank));
        }
        if let Some(projectile) = &self.projectile {
            validate_projectile(projectile, self.active_tank, alive, &config)?;
        }

        Ok(Match::from_parts(
            config,
            MatchParts {
                id: self.match_id,
                seed: self.seed,
                rng: self.rng,
                terrain,
                tanks,
                active: self.active_tank,
                wind: self.wind,
                ai_mode: self.ai_mode,
                projectile: self.projectile,
            },
        ))
    }
}

/// A saved shell must belong to the active tank of a running match
fn validate_projectile(
    projectile: &Projectile,
    active: TankId,
    alive: usize,
    config: &RoundConfig,
) -> Result<(), LoadError> {
    if alive <= 1 {
        return Err(LoadError::Projectile("phase"));
    }
    if projectile.owner != active {
        return Err(LoadError::Projectile("owner"));
    }
    let width = config.terrain.world_width;
    if !projectile.x.is_finite() || projectile.x < 0.0 || projectile.x > width {
        return Err(LoadError::Projectile("x"));
    }
    let finite = [
        ("y", projectile.y),
        ("angle", projectile.angle),
        ("velocity", projectile.velocity),
        ("elapsed", projectile.elapsed),
    ];
    for (field, value) in finite {
        if !value.is_finite() {
            return Err(LoadError::Projectile(field));
        }
    }
    if projectile.elapsed < 0.0 {
        return Err(LoadError::Projectile("elapsed"));
    }
    let trail_ok = projectile.trail.len() <= config.ballistics.trail_capacity
        && projectile
            .trail
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite());
    if !trail_ok {
        return Err(LoadError::Projectile("trail"));
    }
    Ok(())
}

/// Serialize `game` into the slot, replacing whatever was there
pub fn save_match<S: SaveSlot + ?Sized>(slot: &mut S, game: &Match) -> Result<(), StoreError> {
    let state = SaveState::capture(game);
    let json = serde_json::to_string(&state)?;
    slot.write(&json)?;
    info!(match_id = %game.id(), bytes = json.len(), "Match saved");
    Ok(())
}

/// Load the slot into a new match; `Ok(None)` if the slot is empty
pub fn load_match<S: SaveSlot + ?Sized>(
    slot: &S,
    config: RoundConfig,
) -> Result<Option<Match>, StoreError> {
    let Some(json) = slot.read()? else {
        return Ok(None);
    };
    let state: SaveState = serde_json::from_str(&json)?;
    let game = state.into_match(config)?;
    info!(match_id = %game.id(), "Match loaded");
    Ok(Some(game))
}

/// Replace `game` with the slot's contents. On any failure `game` is untouched.
pub fn restore_match<S: SaveSlot + ?Sized>(slot: &S, game: &mut Match) -> Result<bool, StoreError> {
    match load_match(slot, *game.config()) {
        Ok(Some(loaded)) => {
            *game = loaded;
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(err) => {
            warn!(match_id = %game.id(), error = %err, "Failed to restore match");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actions::{Action, ActionError};
    use crate::game::r#match::MatchPhase;
    use crate::game::tank::UpgradeKind;
    use crate::store::slot::MemorySlot;

    fn played_match() -> Match {
        let mut game = Match::duel(RoundConfig::default(), 2024).unwrap();
        game.apply(Action::SetAngle {
            tank: TankId(0),
            degrees: 60.0,
        })
        .unwrap();
        game.apply(Action::Fire).unwrap();
        while game.projectile().is_some() {
            game.tick();
        }
        game
    }

    #[test]
    fn save_then_load_restores_state() {
        let game = played_match();
        let mut slot = MemorySlot::new();
        save_match(&mut slot, &game).unwrap();

        let loaded = load_match(&slot, RoundConfig::default()).unwrap().unwrap();
        assert_eq!(loaded.id(), game.id());
        assert_eq!(loaded.active(), game.active());
        assert_eq!(loaded.wind(), game.wind());
        assert_eq!(loaded.terrain().samples(), game.terrain().samples());
        for (a, b) in loaded.tanks().iter().zip(game.tanks()) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.angle, b.angle);
            assert_eq!(a.health, b.health);
            assert_eq!(a.fuel, b.fuel);
            assert_eq!(a.money, b.money);
            assert_eq!(a.team, b.team);
        }
    }

    #[test]
    fn resumed_match_continues_identically() {
        let mut original = played_match();
        let mut slot = MemorySlot::new();
        save_match(&mut slot, &original).unwrap();
        let mut resumed = load_match(&slot, RoundConfig::default()).unwrap().unwrap();

        assert_eq!(original.reset(), resumed.reset());
        assert_eq!(original.terrain().samples(), resumed.terrain().samples());
    }

    #[test]
    fn save_during_flight_keeps_the_shell() {
        let mut original = Match::duel(RoundConfig::default(), 1234).unwrap();
        original.apply(Action::Fire).unwrap();
        original.tick();
        let fuel = original.tank(TankId(0)).unwrap().fuel;

        let mut slot = MemorySlot::new();
        save_match(&mut slot, &original).unwrap();
        let mut resumed = load_match(&slot, RoundConfig::default()).unwrap().unwrap();

        assert_eq!(resumed.projectile(), original.projectile());
        assert!(matches!(resumed.phase(), MatchPhase::InFlight(_)));
        assert_eq!(resumed.tank(TankId(0)).unwrap().fuel, fuel);
        assert!(matches!(
            resumed.apply(Action::Fire),
            Err(ActionError::ProjectileInFlight)
        ));

        // both copies land the same shell and hand over the turn
        let mut original_events = Vec::new();
        let mut resumed_events = Vec::new();
        while original.projectile().is_some() {
            original_events.extend(original.tick());
            resumed_events.extend(resumed.tick());
        }
        assert!(resumed.projectile().is_none());
        assert_eq!(original_events, resumed_events);
        assert_eq!(resumed.active(), TankId(1));
    }

    #[test]
    fn saved_shell_must_belong_to_the_active_tank() {
        let mut game = Match::duel(RoundConfig::default(), 1234).unwrap();
        game.apply(Action::Fire).unwrap();
        game.tick();

        let mut state = SaveState::capture(&game);
        if let Some(projectile) = state.projectile.as_mut() {
            projectile.owner = TankId(1);
        }
        assert_eq!(
            state.into_match(RoundConfig::default()).unwrap_err(),
            LoadError::Projectile("owner")
        );

        let mut state = SaveState::capture(&game);
        if let Some(projectile) = state.projectile.as_mut() {
            projectile.x = f32::NAN;
        }
        assert_eq!(
            state.into_match(RoundConfig::default()).unwrap_err(),
            LoadError::Projectile("x")
        );
    }

    #[test]
    fn empty_slot_loads_nothing() {
        let slot = MemorySlot::new();
        assert!(load_match(&slot, RoundConfig::default()).unwrap().is_none());
    }

    #[test]
    fn corrupt_snapshots_are_rejected() {
        let game = played_match();
        let base = SaveState::capture(&game);

        let mut state = base.clone();
        state.version = 2;
        assert_eq!(
            state.into_match(RoundConfig::default()).unwrap_err(),
            LoadError::UnsupportedVersion(2)
        );

        let mut state = base.clone();
        state.tanks[1].health = 250.0;
        assert_eq!(
            state.into_match(RoundConfig::default()).unwrap_err(),
            LoadError::Tank {
                index: 1,
                field: "health"
            }
        );

        let mut state = base.clone();
        state.active_tank = TankId(5);
        assert_eq!(
            state.into_match(RoundConfig::default()).unwrap_err(),
            LoadError::ActiveTank(TankId(5))
        );

        let mut state = base.clone();
        state.terrain.pop();
        assert!(matches!(
            state.into_match(RoundConfig::default()),
            Err(LoadError::Terrain(TerrainError::SampleCount { .. }))
        ));

        let mut state = base;
        state.players.pop();
        assert!(matches!(
            state.into_match(RoundConfig::default()),
            Err(LoadError::RosterMismatch { .. })
        ));
    }

    #[test]
    fn failed_restore_leaves_match_untouched() {
        let mut game = played_match();
        let before = SaveState::capture(&game);

        let mut slot = MemorySlot::new();
        slot.write("{\"version\":1,\"players\":[]").unwrap();
        assert!(matches!(
            restore_match(&slot, &mut game),
            Err(StoreError::Parse(_))
        ));

        let mut bad = before.clone();
        bad.wind = f32::INFINITY;
        slot.write(&serde_json::to_string(&bad).unwrap_or_default()).unwrap();
        assert!(restore_match(&slot, &mut game).is_err());

        assert_eq!(game.id(), before.match_id);
        assert_eq!(game.wind(), before.wind);
        assert_eq!(game.terrain().samples(), before.terrain.as_slice());
    }

    #[test]
    fn economy_survives_round_trip() {
        let mut game = played_match();
        let shooter = game.active();
        let mut slot = MemorySlot::new();

        // earn enough for one upgrade, then persist
        save_match(&mut slot, &game).unwrap();
        let mut state: SaveState = serde_json::from_str(&slot.read().unwrap().unwrap()).unwrap();
        state.players[shooter.0].money = 100;
        game = state.into_match(RoundConfig::default()).unwrap();
        game.apply(Action::BuyUpgrade {
            tank: shooter,
            kind: UpgradeKind::Armor,
        })
        .unwrap();

        save_match(&mut slot, &game).unwrap();
        let loaded = load_match(&slot, RoundConfig::default()).unwrap().unwrap();
        let tank = loaded.tank(shooter).unwrap();
        assert_eq!(tank.upgrades.armor, 1);
        assert_eq!(tank.money, 0);
    }
}
