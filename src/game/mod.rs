//! Game simulation modules

pub mod actions;
pub mod ai;
pub mod combat;
pub mod events;
pub mod r#match;
pub mod physics;
pub mod snapshot;
pub mod tank;
pub mod terrain;

pub use actions::{Action, ActionError, Direction};
pub use events::{dispatch_audio, AudioSink, GameEvent};
pub use r#match::{Match, MatchPhase, RoundConfig, SetupError, TankSpec};
pub use snapshot::{RenderSnapshot, SnapshotBuilder};
pub use tank::{Controller, Tank, TankId, Team, UpgradeKind, Upgrades};
pub use terrain::TerrainField;
