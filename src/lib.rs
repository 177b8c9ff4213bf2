//! Tank Duel - simulation core for a turn-based two-tank artillery game

pub mod app;
pub mod config;
pub mod game;
pub mod store;
pub mod util;
