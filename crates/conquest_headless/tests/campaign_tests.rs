//! End-to-end runs of the headless runner over fixture campaigns.

use conquest_core::match_controller::MatchPhase;
use conquest_core::registry::Outcome;
use conquest_headless::game_runner::{run_game, GameConfig};
use conquest_headless::protocol::{Command, Response};
use conquest_headless::runner::{HeadlessConfig, HeadlessRunner};
use conquest_headless::scenario::Scenario;
use conquest_headless::strategies::Strategy;
use conquest_test_utils::fixtures::{
    doomed_level, easy_win_level, instant_config, level_set, write_level_file,
};

fn campaign(dir: &std::path::Path) -> Scenario {
    let path = write_level_file(dir, &level_set(vec![easy_win_level(), doomed_level()]));
    let mut scenario = Scenario::load(&path).unwrap();
    scenario.config = instant_config();
    scenario
}

#[test]
fn level_file_loads_as_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = campaign(dir.path());
    assert_eq!(scenario.name, "levels");
    assert_eq!(scenario.levels.levels.len(), 2);
}

#[test]
fn won_level_is_remembered_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = campaign(dir.path());
    let config = HeadlessConfig {
        seed: 3,
        auto_state_output: false,
        progress_path: Some(dir.path().join("progress.ron")),
    };

    let mut first = HeadlessRunner::new(&scenario, config.clone()).unwrap();
    first.handle(&Command::Resume);
    let responses = first.handle(&Command::Tick { count: 120 });
    assert!(responses.iter().any(|r| matches!(
        r,
        Response::Outcome {
            level: 0,
            result: Outcome::Won,
            ..
        }
    )));
    assert_eq!(first.controller().level_index(), 1);

    let second = HeadlessRunner::new(&scenario, config).unwrap();
    assert_eq!(second.controller().level_index(), 1);
    assert_eq!(second.controller().phase(), MatchPhase::Paused);
}

#[test]
fn lost_level_is_replayed() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = campaign(dir.path());
    scenario.levels.levels.swap(0, 1);

    let mut runner = HeadlessRunner::new(&scenario, HeadlessConfig::default()).unwrap();
    runner.handle(&Command::Resume);
    let responses = runner.handle(&Command::Tick { count: 120 });

    assert!(responses.iter().any(|r| matches!(
        r,
        Response::Outcome {
            level: 0,
            result: Outcome::Lost,
            ..
        }
    )));
    assert_eq!(runner.controller().level_index(), 0);
}

#[test]
fn passive_player_finishes_preset_campaign() {
    let dir = tempfile::tempdir().unwrap();
    let mut scenario = campaign(dir.path());
    scenario.levels.levels.truncate(1);

    let config = GameConfig {
        strategy: Strategy::passive(),
        max_ticks: 500,
        ..GameConfig::new(scenario, 11)
    };
    let result = run_game(config).unwrap();

    assert!(result.metrics.campaign_complete);
    assert_eq!(result.metrics.orders_issued, 0);
    assert_eq!(result.metrics.levels_won(), 1);
}
