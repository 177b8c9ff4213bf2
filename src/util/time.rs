//! Time utilities for game simulation

use std::time::Duration;

/// Default frame rate of the external redraw tick
pub const SIMULATION_TPS: u32 = 60; // 60 frames per second

/// Simulation time that elapses per frame (fixed, independent of TPS)
pub const SIMULATION_DT: f32 = 0.1;

/// Real-time duration of one frame at the given rate
pub fn tick_duration(tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / tps.max(1) as u64)
}

/// Convert a logical delay in milliseconds to a whole number of frames
pub fn millis_to_ticks(millis: u64, tps: u32) -> u32 {
    let ticks = millis.saturating_mul(u64::from(tps)) / 1000;
    u32::try_from(ticks).unwrap_or(u32::MAX)
}
