//! Match state and the turn state machine

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::actions::{Action, ActionError};
use super::ai::{AiOpponent, AiStats};
use super::combat::{BlastStats, CombatSystem, ImpactReport};
use super::events::GameEvent;
use super::physics::{BallisticsStats, PhysicsSystem, Projectile};
use super::tank::{
    Controller, Tank, TankId, TankLimits, Team, TeamError, UpgradeKind, MAX_UPGRADE_LEVEL,
};
use super::terrain::{TerrainField, TerrainSettings};

/// Gameplay constants for a match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundConfig {
    pub terrain: TerrainSettings,
    pub ballistics: BallisticsStats,
    pub blast: BlastStats,
    pub ai: AiStats,
    pub limits: TankLimits,
    /// Wind is drawn uniformly from `[-max_wind_speed, max_wind_speed]`
    pub max_wind_speed: f32,
    /// Tanks stay within `[tank_margin, world_width - tank_margin]`
    pub tank_margin: f32,
    pub fire_fuel_cost: f32,
    pub move_fuel_cost: f32,
    /// Distance covered by one move step
    pub move_step: f32,
    /// Frames the AI waits after its turn begins
    pub ai_delay_ticks: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainSettings::default(),
            ballistics: BallisticsStats::default(),
            blast: BlastStats::default(),
            ai: AiStats::default(),
            limits: TankLimits::default(),
            max_wind_speed: 5.0,
            tank_margin: 30.0,
            fire_fuel_cost: 10.0,
            move_fuel_cost: 1.0,
            move_step: 2.0,
            ai_delay_ticks: 60,
        }
    }
}

/// Where a tank starts and who drives it
#[derive(Debug, Clone, PartialEq)]
pub struct TankSpec {
    pub team: Team,
    pub controller: Controller,
    pub x: f32,
}

/// Roster errors at match construction
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SetupError {
    #[error("A match needs at least 2 tanks, got {0}")]
    TooFewTanks(usize),

    #[error("Invalid team: {0}")]
    Team(#[from] TeamError),

    #[error("Tank {index} spawns at x={x}, outside the playable area")]
    SpawnOutOfBounds { index: usize, x: f32 },
}

/// Turn phase
#[derive(Debug, Clone, PartialEq)]
pub enum MatchPhase {
    /// Active tank may aim, move, shop or fire
    AwaitingInput,
    /// The single live projectile
    InFlight(Projectile),
    /// Impact being applied (only observable inside a tick)
    Resolving,
    /// Terminal until reset; `None` is a draw
    GameOver { winner: Option<TankId> },
}

/// State restored from a save
pub(crate) struct MatchParts {
    pub id: Uuid,
    pub seed: u64,
    pub rng: ChaCha8Rng,
    pub terrain: TerrainField,
    pub tanks: Vec<Tank>,
    pub active: TankId,
    pub wind: f32,
    pub ai_mode: bool,
    /// Shell that was airborne when the match was saved
    pub projectile: Option<Projectile>,
}

/// The authoritative match: owns the terrain, the roster and the projectile
#[derive(Debug, Clone)]
pub struct Match {
    id: Uuid,
    seed: u64,
    config: RoundConfig,
    rng: ChaCha8Rng,
    terrain: TerrainField,
    tanks: Vec<Tank>,
    active: TankId,
    phase: MatchPhase,
    wind: f32,
    ai_mode: bool,
    ai_countdown: Option<u32>,
    tick: u64,
}

impl Match {
    /// Create a match from an explicit roster; turn order is roster order
    pub fn new(config: RoundConfig, roster: Vec<TankSpec>, seed: u64) -> Result<Self, SetupError> {
        if roster.len() < 2 {
            return Err(SetupError::TooFewTanks(roster.len()));
        }

        let min_x = config.tank_margin;
        let max_x = config.terrain.world_width - config.tank_margin;
        let mut tanks = Vec::with_capacity(roster.len());
        for (index, spec) in roster.into_iter().enumerate() {
            spec.team.validate()?;
            if !(min_x..=max_x).contains(&spec.x) {
                return Err(SetupError::SpawnOutOfBounds { index, x: spec.x });
            }
            tanks.push(Tank::new(
                TankId(index),
                spec.team,
                spec.controller,
                spec.x,
                &config.limits,
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let terrain = TerrainField::generate(config.terrain, &mut rng);
        let wind = sample_wind(&mut rng, config.max_wind_speed);

        let id = Uuid::new_v4();
        info!(match_id = %id, seed, tanks = tanks.len(), wind, "Match created");

        Ok(Self {
            id,
            seed,
            config,
            rng,
            terrain,
            tanks,
            active: TankId(0),
            phase: MatchPhase::AwaitingInput,
            wind,
            ai_mode: false,
            ai_countdown: None,
            tick: 0,
        })
    }

    /// Classic layout: red human on the left, blue computer-capable tank on the right
    pub fn duel(config: RoundConfig, seed: u64) -> Result<Self, SetupError> {
        let width = config.terrain.world_width;
        let roster = vec![
            TankSpec {
                team: Team::red(),
                controller: Controller::Human,
                x: 50.0_f32.min(width / 2.0),
            },
            TankSpec {
                team: Team::blue(),
                controller: Controller::Computer,
                x: (width - 70.0).max(width / 2.0),
            },
        ];
        Self::new(config, roster, seed)
    }

    pub(crate) fn from_parts(config: RoundConfig, parts: MatchParts) -> Self {
        let mut restored = Self {
            id: parts.id,
            seed: parts.seed,
            config,
            rng: parts.rng,
            terrain: parts.terrain,
            tanks: parts.tanks,
            active: parts.active,
            phase: MatchPhase::AwaitingInput,
            wind: parts.wind,
            ai_mode: parts.ai_mode,
            ai_countdown: None,
            tick: 0,
        };

        let (over, winner) = CombatSystem::evaluate_outcome(&restored.tanks);
        if over {
            restored.phase = MatchPhase::GameOver { winner };
        } else if let Some(projectile) = parts.projectile {
            restored.phase = MatchPhase::InFlight(projectile);
        } else {
            restored.schedule_ai();
        }
        restored
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub(crate) fn rng(&self) -> &ChaCha8Rng {
        &self.rng
    }

    pub fn terrain(&self) -> &TerrainField {
        &self.terrain
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn tank(&self, id: TankId) -> Option<&Tank> {
        self.tanks.get(id.0)
    }

    pub fn active(&self) -> TankId {
        self.active
    }

    pub fn phase(&self) -> &MatchPhase {
        &self.phase
    }

    pub fn projectile(&self) -> Option<&Projectile> {
        match &self.phase {
            MatchPhase::InFlight(projectile) => Some(projectile),
            _ => None,
        }
    }

    pub fn wind(&self) -> f32 {
        self.wind
    }

    pub fn ai_mode(&self) -> bool {
        self.ai_mode
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, MatchPhase::GameOver { .. })
    }

    pub fn winner(&self) -> Option<TankId> {
        match self.phase {
            MatchPhase::GameOver { winner } => winner,
            _ => None,
        }
    }

    /// Frames left before the AI fires, if it is thinking
    pub fn ai_countdown(&self) -> Option<u32> {
        self.ai_countdown
    }

    /// Whether the active tank is currently driven by the AI
    pub fn is_ai_turn(&self) -> bool {
        self.ai_mode && self.tanks[self.active.0].controller == Controller::Computer
    }

    /// Apply one input command. Rejections leave the match untouched.
    pub fn apply(&mut self, action: Action) -> Result<Vec<GameEvent>, ActionError> {
        let result = self.handle_action(action.clone());
        if let Err(err) = &result {
            warn!(match_id = %self.id, ?action, error = %err, "Action rejected");
        }
        result
    }

    fn handle_action(&mut self, action: Action) -> Result<Vec<GameEvent>, ActionError> {
        match action {
            Action::SetAngle { tank, degrees } => {
                self.check_control(tank)?;
                ensure_finite(degrees)?;
                self.tanks[tank.0].set_angle(degrees);
                Ok(Vec::new())
            }
            Action::SetPower { tank, value } => {
                self.check_control(tank)?;
                ensure_finite(value)?;
                self.tanks[tank.0].set_power(value);
                Ok(Vec::new())
            }
            Action::Fire => {
                self.ensure_awaiting_input()?;
                if self.is_ai_turn() {
                    return Err(ActionError::ComputerControlled(self.active));
                }
                Ok(vec![self.fire_active()?])
            }
            Action::Move { tank, direction } => {
                self.check_control(tank)?;
                self.move_tank(tank, direction.sign())
            }
            Action::Pass => {
                self.ensure_awaiting_input()?;
                if self.is_ai_turn() {
                    return Err(ActionError::ComputerControlled(self.active));
                }
                let mut events = Vec::new();
                info!(match_id = %self.id, tank = %self.active, "Turn passed");
                self.end_turn(&mut events);
                Ok(events)
            }
            Action::ToggleAi { enabled } => {
                self.ai_mode = enabled;
                self.schedule_ai();
                info!(match_id = %self.id, enabled, "AI mode toggled");
                Ok(vec![GameEvent::AiToggled { enabled }])
            }
            Action::BuyUpgrade { tank, kind } => self.buy_upgrade(tank, kind),
            Action::Reset => Ok(self.reset()),
        }
    }

    /// Advance the simulation by one frame
    pub fn tick(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.tick += 1;

        for tank in &mut self.tanks {
            tank.roll = PhysicsSystem::damp_roll(tank.roll);
        }

        match &self.phase {
            MatchPhase::AwaitingInput => self.update_ai(&mut events),
            MatchPhase::InFlight(projectile) => {
                let next = PhysicsSystem::step(projectile, self.wind, &self.config.ballistics);
                if PhysicsSystem::has_impacted(&next, &self.terrain) {
                    self.phase = MatchPhase::Resolving;
                    self.resolve_impact(next, &mut events);
                } else {
                    self.phase = MatchPhase::InFlight(next);
                }
            }
            MatchPhase::Resolving | MatchPhase::GameOver { .. } => {}
        }

        events
    }

    /// Start a new round: fresh terrain and wind, tanks restored, tank 0 to act.
    /// Cancels any projectile in flight. Money and upgrades persist.
    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.terrain = TerrainField::generate(self.config.terrain, &mut self.rng);
        for tank in &mut self.tanks {
            tank.restore(&self.config.limits);
        }
        self.active = TankId(0);
        self.phase = MatchPhase::AwaitingInput;
        self.wind = sample_wind(&mut self.rng, self.config.max_wind_speed);
        self.schedule_ai();

        info!(match_id = %self.id, wind = self.wind, "Match reset");

        vec![
            GameEvent::MatchReset,
            GameEvent::WindChanged { speed: self.wind },
            GameEvent::TurnChanged {
                active: self.active,
            },
        ]
    }

    fn ensure_awaiting_input(&self) -> Result<(), ActionError> {
        match self.phase {
            MatchPhase::AwaitingInput => Ok(()),
            MatchPhase::InFlight(_) | MatchPhase::Resolving => Err(ActionError::ProjectileInFlight),
            MatchPhase::GameOver { .. } => Err(ActionError::MatchOver),
        }
    }

    /// The caller may steer `tank` right now
    fn check_control(&self, tank: TankId) -> Result<(), ActionError> {
        if tank.0 >= self.tanks.len() {
            return Err(ActionError::UnknownTank(tank));
        }
        self.ensure_awaiting_input()?;
        if tank != self.active {
            return Err(ActionError::NotYourTurn(tank));
        }
        if self.is_ai_turn() {
            return Err(ActionError::ComputerControlled(tank));
        }
        Ok(())
    }

    /// Launch from the active tank; fuel is only spent if the shell exists
    fn fire_active(&mut self) -> Result<GameEvent, ActionError> {
        let cost = self.config.fire_fuel_cost;
        let world_width = self.terrain.world_width();
        let tank = &mut self.tanks[self.active.0];

        if !tank.burn_fuel(cost) {
            return Err(ActionError::InsufficientFuel {
                needed: cost,
                available: tank.fuel,
            });
        }

        let x = tank.x;
        let y = self.terrain.surface_y(x) - self.config.ballistics.turret_height;
        let angle = tank.barrel_angle(world_width);
        let projectile = Projectile::new(tank.id, x, y, angle, tank.power);

        info!(
            match_id = %self.id,
            tank = %tank.id,
            angle = tank.angle,
            power = tank.power,
            fuel = tank.fuel,
            "Tank fired"
        );

        let event = GameEvent::Fired {
            tank: tank.id,
            x,
            y,
            angle,
            velocity: projectile.velocity,
        };
        self.phase = MatchPhase::InFlight(projectile);
        self.ai_countdown = None;
        Ok(event)
    }

    fn move_tank(&mut self, id: TankId, sign: f32) -> Result<Vec<GameEvent>, ActionError> {
        let min_x = self.config.tank_margin;
        let max_x = self.terrain.world_width() - self.config.tank_margin;
        let cost = self.config.move_fuel_cost;
        let tank = &mut self.tanks[id.0];

        let new_x = (tank.x + sign * self.config.move_step).clamp(min_x, max_x);
        if (new_x - tank.x).abs() < f32::EPSILON {
            return Err(ActionError::OutOfBounds);
        }
        if !tank.burn_fuel(cost) {
            return Err(ActionError::InsufficientFuel {
                needed: cost,
                available: tank.fuel,
            });
        }

        tank.x = new_x;
        tank.roll = PhysicsSystem::slope_roll(&self.terrain, new_x);
        debug!(match_id = %self.id, tank = %id, x = new_x, fuel = tank.fuel, "Tank moved");

        Ok(vec![GameEvent::TankMoved {
            tank: id,
            x: new_x,
            fuel: tank.fuel,
        }])
    }

    fn buy_upgrade(
        &mut self,
        id: TankId,
        kind: UpgradeKind,
    ) -> Result<Vec<GameEvent>, ActionError> {
        if matches!(self.phase, MatchPhase::InFlight(_) | MatchPhase::Resolving) {
            return Err(ActionError::ProjectileInFlight);
        }
        let limits = self.config.limits;
        let tank = self
            .tanks
            .get_mut(id.0)
            .ok_or(ActionError::UnknownTank(id))?;

        if tank.upgrades.level(kind) >= MAX_UPGRADE_LEVEL {
            return Err(ActionError::MaxUpgradeLevel(kind));
        }
        let cost = tank.upgrades.next_cost(kind);
        if tank.money < cost {
            return Err(ActionError::InsufficientFunds {
                needed: cost,
                available: tank.money,
            });
        }

        tank.money -= cost;
        tank.apply_upgrade(kind, &limits);
        let level = tank.upgrades.level(kind);

        info!(match_id = %self.id, tank = %id, ?kind, level, cost, "Upgrade purchased");
        Ok(vec![GameEvent::UpgradePurchased {
            tank: id,
            kind,
            level,
            cost,
        }])
    }

    /// Count down the AI's thinking time and take its shot
    fn update_ai(&mut self, events: &mut Vec<GameEvent>) {
        let Some(remaining) = self.ai_countdown else {
            return;
        };
        if remaining > 0 {
            self.ai_countdown = Some(remaining - 1);
            return;
        }
        self.ai_countdown = None;
        if !self.is_ai_turn() {
            return;
        }

        let shooter = &self.tanks[self.active.0];
        let can_fire = shooter.fuel >= self.config.fire_fuel_cost;
        let decision = match AiOpponent::pick_target(shooter, &self.tanks) {
            Some(target) if can_fire => Some(AiOpponent::decide(
                shooter,
                target,
                &self.terrain,
                &self.config.ai,
                &mut self.rng,
            )),
            _ => None,
        };

        let Some(aim) = decision else {
            info!(match_id = %self.id, tank = %self.active, "AI passes");
            self.end_turn(events);
            return;
        };

        let tank = &mut self.tanks[self.active.0];
        tank.set_angle(aim.angle);
        tank.set_power(aim.power);
        debug!(
            match_id = %self.id,
            tank = %self.active,
            angle = tank.angle,
            power = tank.power,
            "AI aimed"
        );

        match self.fire_active() {
            Ok(event) => events.push(event),
            Err(err) => {
                warn!(match_id = %self.id, error = %err, "AI could not fire");
                self.end_turn(events);
            }
        }
    }

    fn resolve_impact(&mut self, projectile: Projectile, events: &mut Vec<GameEvent>) {
        let report = CombatSystem::resolve_impact(
            &projectile,
            &mut self.terrain,
            &mut self.tanks,
            &self.config.blast,
        );

        info!(
            match_id = %self.id,
            x = report.x,
            y = report.y,
            hits = report.damaged_tanks.len(),
            "Projectile landed"
        );

        events.extend(impact_events(&report, self.config.blast.crater_radius));

        if report.game_over {
            self.finish(report.winner, events);
        } else {
            self.end_turn(events);
        }
    }

    /// Hand the turn to the next living tank and draw a new wind
    fn end_turn(&mut self, events: &mut Vec<GameEvent>) {
        let cost = self.config.fire_fuel_cost;
        if !self.tanks.iter().any(|t| t.is_alive() && t.fuel >= cost) {
            info!(match_id = %self.id, "No tank can fire, stalemate");
            self.finish(None, events);
            return;
        }

        self.active = self.next_alive_after(self.active);
        self.phase = MatchPhase::AwaitingInput;
        self.wind = sample_wind(&mut self.rng, self.config.max_wind_speed);
        self.schedule_ai();

        info!(match_id = %self.id, active = %self.active, wind = self.wind, "Turn changed");
        events.push(GameEvent::TurnChanged {
            active: self.active,
        });
        events.push(GameEvent::WindChanged { speed: self.wind });
    }

    fn finish(&mut self, winner: Option<TankId>, events: &mut Vec<GameEvent>) {
        self.phase = MatchPhase::GameOver { winner };
        self.ai_countdown = None;
        match winner {
            Some(tank) => info!(match_id = %self.id, winner = %tank, "Match over"),
            None => info!(match_id = %self.id, "Match over, draw"),
        }
        events.push(GameEvent::MatchOver { winner });
    }

    fn next_alive_after(&self, current: TankId) -> TankId {
        let count = self.tanks.len();
        (1..=count)
            .map(|step| (current.0 + step) % count)
            .find(|&index| self.tanks[index].is_alive())
            .map(TankId)
            .unwrap_or(current)
    }

    fn schedule_ai(&mut self) {
        let awaiting = matches!(self.phase, MatchPhase::AwaitingInput);
        self.ai_countdown = if awaiting && self.is_ai_turn() {
            Some(self.config.ai_delay_ticks)
        } else {
            None
        };
    }
}

fn impact_events(report: &ImpactReport, radius: f32) -> Vec<GameEvent> {
    let mut events = vec![GameEvent::Explosion {
        x: report.x,
        y: report.y,
        radius,
    }];
    for hit in &report.damaged_tanks {
        events.push(GameEvent::TankDamaged {
            tank: hit.tank_id,
            shooter: report.shooter,
            amount: hit.amount,
            remaining_health: hit.remaining_health,
        });
        if hit.destroyed {
            events.push(GameEvent::TankDestroyed { tank: hit.tank_id });
        }
    }
    events
}

fn ensure_finite(value: f32) -> Result<(), ActionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ActionError::InvalidValue(value))
    }
}

fn sample_wind<R: Rng + ?Sized>(rng: &mut R, max_wind_speed: f32) -> f32 {
    if max_wind_speed > 0.0 {
        rng.gen_range(-max_wind_speed..=max_wind_speed)
    } else {
        0.0
    }
}
