//! Combat system - blast damage, terrain carving, rewards

use serde::Serialize;
use tracing::info;

use super::physics::{PhysicsSystem, Projectile};
use super::tank::{Tank, TankId, Upgrades};
use super::terrain::TerrainField;

/// Blast parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastStats {
    /// Radius of the crater carved into terrain
    pub crater_radius: f32,
    /// Radius within which tanks take damage
    pub damage_radius: f32,
}

impl Default for BlastStats {
    fn default() -> Self {
        Self {
            crater_radius: 40.0,
            damage_radius: 70.0,
        }
    }
}

/// Damage dealt to one tank by one impact
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageReport {
    pub tank_id: TankId,
    pub amount: f32,
    pub remaining_health: f32,
    pub destroyed: bool,
}

/// Everything an impact changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub x: f32,
    pub y: f32,
    pub shooter: TankId,
    pub damaged_tanks: Vec<DamageReport>,
    /// Money earned by the shooter
    pub reward: u32,
    pub game_over: bool,
    /// `None` with `game_over` set means nobody survived
    pub winner: Option<TankId>,
}

/// Combat system for resolving impacts
pub struct CombatSystem;

impl CombatSystem {
    /// Linear falloff from the blast centre
    pub fn base_damage(distance: f32, damage_radius: f32) -> f32 {
        (damage_radius - distance).max(0.0)
    }

    /// Scale base damage by attacker and defender upgrades
    pub fn calculate_damage(base_damage: f32, attacker: &Upgrades, defender: &Upgrades) -> f32 {
        (base_damage * attacker.damage_multiplier() * defender.armor_multiplier()).max(0.0)
    }

    /// Match outcome once damage has landed: over when at most one tank stands
    pub fn evaluate_outcome(tanks: &[Tank]) -> (bool, Option<TankId>) {
        let mut alive = tanks.iter().filter(|t| t.is_alive());
        match (alive.next(), alive.next()) {
            (Some(_), Some(_)) => (false, None),
            (Some(survivor), None) => (true, Some(survivor.id)),
            _ => (true, None),
        }
    }

    /// Resolve a detonation: carve the crater, damage every tank in range,
    /// pay the shooter, and decide whether the match is over.
    pub fn resolve_impact(
        projectile: &Projectile,
        terrain: &mut TerrainField,
        tanks: &mut [Tank],
        blast: &BlastStats,
    ) -> ImpactReport {
        let (x, y) = (projectile.x, projectile.y);
        terrain.carve(x, y, blast.crater_radius);

        let attacker = tanks
            .iter()
            .find(|t| t.id == projectile.owner)
            .map(|t| t.upgrades)
            .unwrap_or_default();

        let mut damaged_tanks = Vec::new();
        let mut reward = 0u32;

        for tank in tanks.iter_mut() {
            if !tank.is_alive() {
                continue;
            }

            let distance = PhysicsSystem::distance(tank.x, terrain.surface_y(tank.x), x, y);
            if distance >= blast.damage_radius {
                continue;
            }

            let base = Self::base_damage(distance, blast.damage_radius);
            let amount = Self::calculate_damage(base, &attacker, &tank.upgrades);
            let destroyed = tank.take_damage(amount);
            reward += amount.floor() as u32;

            info!(
                tank = %tank.id,
                shooter = %projectile.owner,
                damage = amount,
                health = tank.health,
                "Tank hit"
            );

            damaged_tanks.push(DamageReport {
                tank_id: tank.id,
                amount,
                remaining_health: tank.health,
                destroyed,
            });
        }

        // shooter is paid even for self-inflicted damage
        if let Some(shooter) = tanks.iter_mut().find(|t| t.id == projectile.owner) {
            shooter.money = shooter.money.saturating_add(reward);
        }

        let (game_over, winner) = Self::evaluate_outcome(tanks);

        ImpactReport {
            x,
            y,
            shooter: projectile.owner,
            damaged_tanks,
            reward,
            game_over,
            winner,
        }
    }
}
