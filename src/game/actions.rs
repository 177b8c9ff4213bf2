//! Input commands accepted by a match

use serde::{Deserialize, Serialize};

use super::tank::{TankId, UpgradeKind};

/// Horizontal movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// Commands issued by the input collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Set barrel elevation (clamped to 1..=89 degrees)
    SetAngle { tank: TankId, degrees: f32 },

    /// Set firing power (clamped to 200..=1000)
    SetPower { tank: TankId, value: f32 },

    /// Fire the active tank
    Fire,

    /// Drive one step
    Move { tank: TankId, direction: Direction },

    /// End the active tank's turn without firing
    Pass,

    /// Enable or disable computer control of `Computer` tanks
    ToggleAi { enabled: bool },

    /// Spend money on an upgrade level
    BuyUpgrade { tank: TankId, kind: UpgradeKind },

    /// Start a new round
    Reset,
}

/// Why an action was rejected. Never fatal; the match state is untouched.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ActionError {
    #[error("Match is over")]
    MatchOver,

    #[error("A projectile is already in flight")]
    ProjectileInFlight,

    #[error("It is not {0}'s turn")]
    NotYourTurn(TankId),

    #[error("{0} is under computer control")]
    ComputerControlled(TankId),

    #[error("Not enough fuel: need {needed}, have {available}")]
    InsufficientFuel { needed: f32, available: f32 },

    #[error("Not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: u32, available: u32 },

    #[error("Cannot move further in that direction")]
    OutOfBounds,

    #[error("Unknown tank {0}")]
    UnknownTank(TankId),

    #[error("{0:?} upgrade is already at max level")]
    MaxUpgradeLevel(UpgradeKind),

    #[error("Invalid value: {0}")]
    InvalidValue(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_use_tagged_json() {
        let action = Action::Move {
            tank: TankId(1),
            direction: Direction::Left,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"move","tank":1,"direction":"left"}"#);

        let parsed: Action = serde_json::from_str(r#"{"type":"fire"}"#).unwrap();
        assert_eq!(parsed, Action::Fire);
    }
}
