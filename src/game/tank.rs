//! Tanks, teams and upgrades

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest and highest barrel elevation in degrees
pub const MIN_ANGLE: f32 = 1.0;
pub const MAX_ANGLE: f32 = 89.0;

/// Firing power range
pub const MIN_POWER: f32 = 200.0;
pub const MAX_POWER: f32 = 1000.0;

/// Highest level any single upgrade can reach
pub const MAX_UPGRADE_LEVEL: u8 = 5;

/// Index of a tank in the match roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TankId(pub usize);

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tank{}", self.0)
    }
}

/// Who drives a tank when AI mode is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    Human,
    /// Driven by the AI opponent while AI mode is enabled, by a human otherwise
    Computer,
}

/// Team errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TeamError {
    #[error("Team name must not be empty")]
    EmptyName,

    #[error("Invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),
}

/// Cosmetic identity of a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub flag: String,
}

impl Team {
    pub fn new(
        name: impl Into<String>,
        primary_color: impl Into<String>,
        secondary_color: impl Into<String>,
        flag: impl Into<String>,
    ) -> Result<Self, TeamError> {
        let team = Self {
            name: name.into(),
            primary_color: primary_color.into(),
            secondary_color: secondary_color.into(),
            flag: flag.into(),
        };
        team.validate()?;
        Ok(team)
    }

    pub fn validate(&self) -> Result<(), TeamError> {
        if self.name.trim().is_empty() {
            return Err(TeamError::EmptyName);
        }
        for color in [&self.primary_color, &self.secondary_color] {
            if !is_hex_color(color) {
                return Err(TeamError::InvalidColor(color.clone()));
            }
        }
        Ok(())
    }

    pub fn red() -> Self {
        Self {
            name: "Red".to_string(),
            primary_color: "#e74c3c".to_string(),
            secondary_color: "#c0392b".to_string(),
            flag: "red".to_string(),
        }
    }

    pub fn blue() -> Self {
        Self {
            name: "Blue".to_string(),
            primary_color: "#3498db".to_string(),
            secondary_color: "#2980b9".to_string(),
            flag: "blue".to_string(),
        }
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Upgrade tracks a player can buy into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Damage,
    Armor,
    Fuel,
}

/// Persistent per-player upgrade levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub damage: u8,
    pub armor: u8,
    pub fuel: u8,
}

impl Upgrades {
    pub fn level(&self, kind: UpgradeKind) -> u8 {
        match kind {
            UpgradeKind::Damage => self.damage,
            UpgradeKind::Armor => self.armor,
            UpgradeKind::Fuel => self.fuel,
        }
    }

    fn level_mut(&mut self, kind: UpgradeKind) -> &mut u8 {
        match kind {
            UpgradeKind::Damage => &mut self.damage,
            UpgradeKind::Armor => &mut self.armor,
            UpgradeKind::Fuel => &mut self.fuel,
        }
    }

    /// Price of the next level of `kind`
    pub fn next_cost(&self, kind: UpgradeKind) -> u32 {
        100 * (self.level(kind) as u32 + 1)
    }

    /// Outgoing damage multiplier
    pub fn damage_multiplier(&self) -> f32 {
        1.0 + self.damage as f32 * 0.1
    }

    /// Incoming damage multiplier, never negative
    pub fn armor_multiplier(&self) -> f32 {
        (1.0 - self.armor as f32 * 0.1).max(0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.damage <= MAX_UPGRADE_LEVEL
            && self.armor <= MAX_UPGRADE_LEVEL
            && self.fuel <= MAX_UPGRADE_LEVEL
    }
}

/// Per-round stat limits shared by every tank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankLimits {
    pub max_health: f32,
    pub base_max_fuel: f32,
    pub fuel_per_upgrade: f32,
}

impl Default for TankLimits {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            base_max_fuel: 100.0,
            fuel_per_upgrade: 20.0,
        }
    }
}

/// A tank and the player who owns it
#[derive(Debug, Clone, Serialize)]
pub struct Tank {
    pub id: TankId,
    pub team: Team,
    pub controller: Controller,
    pub x: f32,
    /// Where the tank starts each round
    pub spawn_x: f32,
    /// Elevation in degrees, relative to the direction the tank faces
    pub angle: f32,
    pub power: f32,
    pub health: f32,
    pub max_health: f32,
    pub fuel: f32,
    pub max_fuel: f32,
    /// Cosmetic tilt from terrain slope, in degrees
    pub roll: f32,
    pub upgrades: Upgrades,
    pub money: u32,
}

impl Tank {
    pub fn new(
        id: TankId,
        team: Team,
        controller: Controller,
        x: f32,
        limits: &TankLimits,
    ) -> Self {
        let upgrades = Upgrades::default();
        let max_fuel = limits.base_max_fuel;
        Self {
            id,
            team,
            controller,
            x,
            spawn_x: x,
            angle: 45.0,
            power: 500.0,
            health: limits.max_health,
            max_health: limits.max_health,
            fuel: max_fuel,
            max_fuel,
            roll: 0.0,
            upgrades,
            money: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees.clamp(MIN_ANGLE, MAX_ANGLE);
    }

    pub fn set_power(&mut self, value: f32) {
        self.power = value.clamp(MIN_POWER, MAX_POWER);
    }

    /// Barrel direction in world degrees: tanks left of centre face right
    pub fn barrel_angle(&self, world_width: f32) -> f32 {
        if self.x < world_width / 2.0 {
            self.angle
        } else {
            180.0 - self.angle
        }
    }

    /// Spend fuel, returning false (and spending nothing) when short
    pub fn burn_fuel(&mut self, amount: f32) -> bool {
        if self.fuel < amount {
            return false;
        }
        self.fuel -= amount;
        true
    }

    /// Apply damage; returns true when this hit destroyed the tank
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_alive = self.is_alive();
        self.health = (self.health - amount.max(0.0)).max(0.0);
        was_alive && !self.is_alive()
    }

    pub fn max_fuel_for(upgrades: &Upgrades, limits: &TankLimits) -> f32 {
        limits.base_max_fuel + upgrades.fuel as f32 * limits.fuel_per_upgrade
    }

    /// Bump an upgrade level, recomputing derived limits.
    /// Caller has already checked price and level cap.
    pub fn apply_upgrade(&mut self, kind: UpgradeKind, limits: &TankLimits) {
        *self.upgrades.level_mut(kind) += 1;
        if kind == UpgradeKind::Fuel {
            self.max_fuel = Self::max_fuel_for(&self.upgrades, limits);
        }
    }

    /// Restore round stats; money and upgrades carry over
    pub fn restore(&mut self, limits: &TankLimits) {
        self.x = self.spawn_x;
        self.roll = 0.0;
        self.max_health = limits.max_health;
        self.health = self.max_health;
        self.max_fuel = Self::max_fuel_for(&self.upgrades, limits);
        self.fuel = self.max_fuel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank(x: f32) -> Tank {
        Tank::new(TankId(0), Team::red(), Controller::Human, x, &TankLimits::default())
    }

    #[test]
    fn team_validation() {
        assert!(Team::new("Red", "#e74c3c", "#c0392b", "red").is_ok());
        assert_eq!(
            Team::new(" ", "#e74c3c", "#c0392b", "red"),
            Err(TeamError::EmptyName)
        );
        assert_eq!(
            Team::new("Red", "red", "#c0392b", "red"),
            Err(TeamError::InvalidColor("red".to_string()))
        );
        assert!(Team::red().validate().is_ok());
        assert!(Team::blue().validate().is_ok());
    }

    #[test]
    fn upgrade_multipliers() {
        let upgrades = Upgrades {
            damage: 2,
            armor: 1,
            fuel: 0,
        };
        assert!((upgrades.damage_multiplier() - 1.2).abs() < 1e-6);
        assert!((upgrades.armor_multiplier() - 0.9).abs() < 1e-6);

        let heavy = Upgrades {
            damage: 0,
            armor: 12,
            fuel: 0,
        };
        assert_eq!(heavy.armor_multiplier(), 0.0);
        assert!(!heavy.is_valid());
    }

    #[test]
    fn upgrade_costs_scale_with_level() {
        let mut upgrades = Upgrades::default();
        assert_eq!(upgrades.next_cost(UpgradeKind::Armor), 100);
        upgrades.armor = 3;
        assert_eq!(upgrades.next_cost(UpgradeKind::Armor), 400);
    }

    #[test]
    fn angle_and_power_are_clamped() {
        let mut t = tank(50.0);
        t.set_angle(120.0);
        assert_eq!(t.angle, MAX_ANGLE);
        t.set_angle(-3.0);
        assert_eq!(t.angle, MIN_ANGLE);
        t.set_power(5000.0);
        assert_eq!(t.power, MAX_POWER);
        t.set_power(0.0);
        assert_eq!(t.power, MIN_POWER);
    }

    #[test]
    fn barrel_faces_the_middle() {
        let mut left = tank(50.0);
        left.set_angle(30.0);
        assert_eq!(left.barrel_angle(800.0), 30.0);

        let mut right = tank(730.0);
        right.set_angle(30.0);
        assert_eq!(right.barrel_angle(800.0), 150.0);
    }

    #[test]
    fn damage_reports_the_killing_blow_once() {
        let mut t = tank(50.0);
        assert!(!t.take_damage(60.0));
        assert!(t.take_damage(60.0));
        assert_eq!(t.health, 0.0);
        assert!(!t.take_damage(10.0));
        assert!(!t.take_damage(-5.0));
        assert_eq!(t.health, 0.0);
    }

    #[test]
    fn burn_fuel_is_all_or_nothing() {
        let mut t = tank(50.0);
        t.fuel = 5.0;
        assert!(!t.burn_fuel(10.0));
        assert_eq!(t.fuel, 5.0);
        assert!(t.burn_fuel(5.0));
        assert_eq!(t.fuel, 0.0);
    }

    #[test]
    fn restore_keeps_money_and_upgrades() {
        let limits = TankLimits::default();
        let mut t = tank(50.0);
        t.money = 250;
        t.apply_upgrade(UpgradeKind::Fuel, &limits);
        t.health = 10.0;
        t.fuel = 0.0;
        t.x = 90.0;

        t.restore(&limits);
        assert_eq!(t.health, 100.0);
        assert_eq!(t.max_fuel, 120.0);
        assert_eq!(t.fuel, 120.0);
        assert_eq!(t.x, 50.0);
        assert_eq!(t.money, 250);
        assert_eq!(t.upgrades.fuel, 1);
    }
}
