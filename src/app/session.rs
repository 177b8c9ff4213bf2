//! Headless session: drives a match at a fixed frame rate with the AI on
//! every tank, autosaving between turns.

use std::future::Future;
use std::sync::Arc;

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::game::events::LoggingAudio;
use crate::game::{
    dispatch_audio, Action, Controller, GameEvent, Match, RenderSnapshot, SetupError,
    SnapshotBuilder, TankId, TankSpec, Team,
};
use crate::store::{load_match, save_match, SaveSlot};
use crate::util::time::tick_duration;

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub match_id: Uuid,
    pub ticks: u64,
    pub game_over: bool,
    pub winner: Option<TankId>,
}

pub struct Session<S: SaveSlot> {
    config: Arc<Config>,
    game: Match,
    slot: S,
    snapshots: SnapshotBuilder,
    audio: LoggingAudio,
    last_snapshot: Option<RenderSnapshot>,
}

impl<S: SaveSlot> Session<S> {
    /// Resume the match in `slot` if it holds a usable save, else start a new duel
    pub fn new(config: Config, slot: S) -> Result<Self, SetupError> {
        let game = match load_match(&slot, config.round) {
            Ok(Some(game)) if game.is_game_over() => {
                info!(match_id = %game.id(), "Saved match already finished, starting fresh");
                Self::new_match(&config)?
            }
            Ok(Some(game)) if all_computer(&game) => game,
            Ok(Some(game)) => {
                warn!(match_id = %game.id(), "Saved match has human players, starting fresh");
                Self::new_match(&config)?
            }
            Ok(None) => Self::new_match(&config)?,
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable save");
                Self::new_match(&config)?
            }
        };

        let mut session = Self {
            snapshots: SnapshotBuilder::new(config.tps),
            config: Arc::new(config),
            game,
            slot,
            audio: LoggingAudio,
            last_snapshot: None,
        };
        if !session.game.ai_mode() {
            session.apply(Action::ToggleAi { enabled: true });
        }
        Ok(session)
    }

    fn new_match(config: &Config) -> Result<Match, SetupError> {
        let width = config.round.terrain.world_width;
        let roster = vec![
            TankSpec {
                team: Team::red(),
                controller: Controller::Computer,
                x: 50.0,
            },
            TankSpec {
                team: Team::blue(),
                controller: Controller::Computer,
                x: width - 70.0,
            },
        ];
        Match::new(config.round, roster, config.seed)
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Most recent periodic snapshot
    pub fn last_snapshot(&self) -> Option<&RenderSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Apply an input command, logging rejections
    pub fn apply(&mut self, action: Action) -> Vec<GameEvent> {
        match self.game.apply(action) {
            Ok(events) => {
                self.react(&events);
                events
            }
            Err(_) => Vec::new(),
        }
    }

    /// Advance one frame
    pub fn step(&mut self) -> Vec<GameEvent> {
        let events = self.game.tick();
        self.react(&events);

        if self.snapshots.should_send() {
            let snapshot = self.snapshots.build(&self.game);
            debug!(tick = snapshot.tick, wind = snapshot.wind, "Snapshot");
            self.last_snapshot = Some(snapshot);
        }
        events
    }

    fn react(&mut self, events: &[GameEvent]) {
        dispatch_audio(events, &mut self.audio);

        let turn_boundary = events.iter().any(|e| {
            matches!(
                e,
                GameEvent::TurnChanged { .. } | GameEvent::MatchOver { .. } | GameEvent::MatchReset
            )
        });
        if turn_boundary {
            self.snapshots.force_next();
            if self.config.autosave {
                self.save();
            }
        }
    }

    fn save(&mut self) {
        if let Err(err) = save_match(&mut self.slot, &self.game) {
            warn!(match_id = %self.game.id(), error = %err, "Autosave failed");
        }
    }

    /// Run until the match ends, `max_ticks` elapse, or `shutdown` resolves
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> SessionSummary {
        info!(
            match_id = %self.game.id(),
            seed = self.game.seed(),
            realtime = self.config.realtime,
            "Session started"
        );

        let mut ticker: Option<Interval> = if self.config.realtime {
            let mut ticker = interval(tick_duration(self.config.tps));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            Some(ticker)
        } else {
            None
        };

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(match_id = %self.game.id(), "Shutdown requested");
                    break;
                }
                _ = next_frame(&mut ticker) => {}
            }

            self.step();

            if self.game.is_game_over() {
                break;
            }
            if self.game.tick_count() >= self.config.max_ticks {
                warn!(
                    match_id = %self.game.id(),
                    ticks = self.game.tick_count(),
                    "Tick limit reached"
                );
                break;
            }
        }

        self.save();

        let summary = SessionSummary {
            match_id: self.game.id(),
            ticks: self.game.tick_count(),
            game_over: self.game.is_game_over(),
            winner: self.game.winner(),
        };
        info!(
            match_id = %summary.match_id,
            ticks = summary.ticks,
            game_over = summary.game_over,
            winner = ?summary.winner,
            "Session finished"
        );
        summary
    }
}

fn all_computer(game: &Match) -> bool {
    game.tanks()
        .iter()
        .all(|t| t.controller == Controller::Computer)
}

async fn next_frame(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => tokio::task::yield_now().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::RoundConfig;
    use crate::store::{MemorySlot, SaveSlot};
    use std::path::PathBuf;

    fn test_config(seed: u64) -> Config {
        let mut round = RoundConfig::default();
        round.ai_delay_ticks = 2;
        Config {
            log_level: "info".to_string(),
            seed,
            tps: 60,
            realtime: false,
            max_ticks: 50_000,
            save_path: PathBuf::from("unused.json"),
            autosave: true,
            round,
        }
    }

    #[test]
    fn autoplay_runs_to_completion_and_saves() {
        let mut session = Session::new(test_config(31), MemorySlot::new()).unwrap();
        assert!(session.game().ai_mode());

        let summary = tokio_test::block_on(session.run_until(std::future::pending()));
        assert!(summary.game_over || summary.ticks >= 50_000);
        assert!(summary.ticks > 0);

        let saved = load_match(session.slot(), RoundConfig::default()).unwrap().unwrap();
        assert_eq!(saved.id(), summary.match_id);
        assert_eq!(saved.is_game_over(), summary.game_over);
    }

    #[test]
    fn step_autosaves_on_turn_change() {
        let mut session = Session::new(test_config(4), MemorySlot::new()).unwrap();
        assert!(session.slot().read().unwrap().is_none());

        let mut saw_turn_change = false;
        for _ in 0..20_000 {
            let events = session.step();
            if events.iter().any(|e| matches!(e, GameEvent::TurnChanged { .. })) {
                saw_turn_change = true;
                break;
            }
        }
        assert!(saw_turn_change);
        assert!(session.slot().read().unwrap().is_some());
        assert!(session.last_snapshot().is_some());
    }

    #[test]
    fn resumes_from_saved_match() {
        let mut first = Session::new(test_config(4), MemorySlot::new()).unwrap();
        while !first.step().iter().any(|e| matches!(e, GameEvent::TurnChanged { .. })) {}
        let id = first.game().id();
        let active = first.game().active();

        let slot = first.slot().clone();
        let resumed = Session::new(test_config(99), slot).unwrap();
        assert_eq!(resumed.game().id(), id);
        assert_eq!(resumed.game().active(), active);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut session = Session::new(test_config(8), MemorySlot::new()).unwrap();
        let summary = tokio_test::block_on(session.run_until(async {}));
        assert_eq!(summary.ticks, 0);
        assert!(!summary.game_over);
    }

    #[test]
    fn stopping_mid_flight_resumes_the_same_shell() {
        let mut first = Session::new(test_config(6), MemorySlot::new()).unwrap();
        while !first.step().iter().any(|e| matches!(e, GameEvent::Fired { .. })) {}
        first.step();
        tokio_test::block_on(first.run_until(async {}));

        let shooter = first.game().active();
        let fuel = first.game().tank(shooter).unwrap().fuel;
        let shell = first.game().projectile().cloned();
        assert!(shell.is_some());

        let resumed = Session::new(test_config(6), first.slot().clone()).unwrap();
        assert_eq!(resumed.game().projectile().cloned(), shell);
        assert_eq!(resumed.game().active(), shooter);
        assert_eq!(resumed.game().tank(shooter).unwrap().fuel, fuel);
        assert_eq!(resumed.game().ai_countdown(), None);
    }
}
