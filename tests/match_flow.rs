use tank_duel::game::{
    Action, ActionError, Controller, Direction, GameEvent, Match, MatchPhase, RoundConfig, TankId,
    TankSpec, Team,
};

fn calm_config() -> RoundConfig {
    let mut config = RoundConfig::default();
    config.max_wind_speed = 0.0;
    config
}

fn human_duel(config: RoundConfig, seed: u64) -> Match {
    let roster = vec![
        TankSpec {
            team: Team::red(),
            controller: Controller::Human,
            x: 50.0,
        },
        TankSpec {
            team: Team::blue(),
            controller: Controller::Human,
            x: 730.0,
        },
    ];
    Match::new(config, roster, seed).unwrap()
}

fn ai_duel(seed: u64) -> Match {
    let mut config = RoundConfig::default();
    config.ai_delay_ticks = 1;
    let roster = vec![
        TankSpec {
            team: Team::red(),
            controller: Controller::Computer,
            x: 50.0,
        },
        TankSpec {
            team: Team::blue(),
            controller: Controller::Computer,
            x: 730.0,
        },
    ];
    let mut game = Match::new(config, roster, seed).unwrap();
    game.apply(Action::ToggleAi { enabled: true }).unwrap();
    game
}

#[test]
fn single_shot_flies_right_and_hands_over_the_turn() {
    let mut game = human_duel(calm_config(), 2024);
    assert_eq!(game.wind(), 0.0);
    assert_eq!(game.active(), TankId(0));

    game.apply(Action::SetAngle {
        tank: TankId(0),
        degrees: 45.0,
    })
    .unwrap();
    game.apply(Action::SetPower {
        tank: TankId(0),
        value: 500.0,
    })
    .unwrap();

    let fired = game.apply(Action::Fire).unwrap();
    assert!(matches!(fired.as_slice(), [GameEvent::Fired { tank: TankId(0), .. }]));
    assert_eq!(game.tank(TankId(0)).unwrap().fuel, 90.0);

    // a second shot is refused while the first is airborne
    assert!(game.apply(Action::Fire).is_err());

    let mut last_x = game.projectile().unwrap().x;
    let mut events = Vec::new();
    for _ in 0..10_000 {
        events = game.tick();
        match game.phase() {
            MatchPhase::InFlight(projectile) => {
                assert!(projectile.x > last_x);
                assert!(projectile.trail.len() <= 20);
                last_x = projectile.x;
            }
            _ => break,
        }
    }

    let explosions = events
        .iter()
        .filter(|e| matches!(e, GameEvent::Explosion { .. }))
        .count();
    let turn_changes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::TurnChanged { active } => Some(*active),
            _ => None,
        })
        .collect();
    let wind_changes = events
        .iter()
        .filter(|e| matches!(e, GameEvent::WindChanged { .. }))
        .count();

    assert_eq!(explosions, 1);
    assert_eq!(turn_changes, vec![TankId(1)]);
    assert_eq!(wind_changes, 1);
    assert_eq!(game.active(), TankId(1));
    assert!(matches!(game.phase(), MatchPhase::AwaitingInput));
    assert!(game.projectile().is_none());
}

#[test]
fn ai_duel_is_reproducible_from_seed() {
    let run = |seed| {
        let mut game = ai_duel(seed);
        let mut log = Vec::new();
        for _ in 0..100_000 {
            log.extend(game.tick());
            if game.is_game_over() {
                break;
            }
        }
        (log, game.winner(), game.tick_count())
    };

    assert_eq!(run(77), run(77));
}

#[test]
fn ai_duel_health_and_fuel_never_recover_mid_round() {
    let mut game = ai_duel(5);
    let mut health: Vec<f32> = game.tanks().iter().map(|t| t.health).collect();
    let mut fuel: Vec<f32> = game.tanks().iter().map(|t| t.fuel).collect();

    for _ in 0..100_000 {
        game.tick();
        for (i, tank) in game.tanks().iter().enumerate() {
            assert!(tank.health <= health[i]);
            assert!(tank.fuel <= fuel[i]);
            assert!((0.0..=tank.max_health).contains(&tank.health));
            health[i] = tank.health;
            fuel[i] = tank.fuel;
        }
        if game.is_game_over() {
            break;
        }
    }

    let alive = game.tanks().iter().filter(|t| t.is_alive()).count();
    if game.is_game_over() {
        // a fuel stalemate ends with both tanks standing and no winner
        assert!(alive <= 1 || game.winner().is_none());
        if let Some(winner) = game.winner() {
            assert_eq!(alive, 1);
            assert!(game.tank(winner).unwrap().is_alive());
        }
    }
}

#[test]
fn fuel_stalemate_ends_in_a_draw() {
    let mut config = calm_config();
    config.fire_fuel_cost = 60.0;
    let mut game = human_duel(config, 9);

    game.apply(Action::Fire).unwrap();
    for _ in 0..10_000 {
        game.tick();
        if !matches!(game.phase(), MatchPhase::InFlight(_)) {
            break;
        }
    }
    assert_eq!(game.active(), TankId(1));
    assert_eq!(game.tank(TankId(0)).unwrap().fuel, 40.0);

    // tank 0 can no longer afford a shot; drain tank 1 below the cost too
    for _ in 0..41 {
        game.apply(Action::Move {
            tank: TankId(1),
            direction: Direction::Left,
        })
        .unwrap();
    }
    assert_eq!(game.tank(TankId(1)).unwrap().fuel, 59.0);
    assert!(!game.is_game_over());

    let events = game.apply(Action::Pass).unwrap();
    assert_eq!(events, vec![GameEvent::MatchOver { winner: None }]);
    assert!(game.is_game_over());
    assert_eq!(game.winner(), None);
    assert!(game.tanks().iter().all(|t| t.is_alive()));
    assert!(matches!(
        game.apply(Action::Pass),
        Err(ActionError::MatchOver)
    ));
}

#[test]
fn reset_restores_tanks_but_keeps_earnings() {
    let mut game = ai_duel(11);
    for _ in 0..100_000 {
        game.tick();
        if game.is_game_over() {
            break;
        }
    }

    let money: Vec<u32> = game.tanks().iter().map(|t| t.money).collect();
    let events = game.apply(Action::Reset).unwrap();
    assert_eq!(events.first(), Some(&GameEvent::MatchReset));

    assert!(!game.is_game_over());
    assert_eq!(game.active(), TankId(0));
    for (tank, earned) in game.tanks().iter().zip(money) {
        assert_eq!(tank.health, tank.max_health);
        assert_eq!(tank.fuel, tank.max_fuel);
        assert_eq!(tank.x, tank.spawn_x);
        assert_eq!(tank.money, earned);
    }
}
