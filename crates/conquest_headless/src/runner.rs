//! Headless runner: drives a match from JSON-lines commands.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use conquest_core::components::TowerId;
use conquest_core::error::Result as GameResult;
use conquest_core::match_controller::{MatchController, MatchPhase};
use conquest_core::math::Vec2Fixed;
use conquest_core::progress::{MemoryProgress, ProgressStore, RonProgressFile};
use conquest_core::simulation::Simulation;

use crate::protocol::{CaptureState, Command, Response, TowerState, UnitState};
use crate::scenario::Scenario;
use crate::sinks::LogSink;

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Match seed.
    pub seed: u64,
    /// Output a state snapshot after every `tick` command.
    pub auto_state_output: bool,
    /// Progress file; progress is kept in memory when absent.
    pub progress_path: Option<PathBuf>,
}

/// Headless runner for externally controlled play.
pub struct HeadlessRunner {
    controller: MatchController,
    config: HeadlessConfig,
}

impl std::fmt::Debug for HeadlessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessRunner")
            .field("controller", &self.controller)
            .field("config", &self.config)
            .finish()
    }
}

impl HeadlessRunner {
    /// Create a runner for `scenario`.
    ///
    /// # Errors
    ///
    /// Fails if the match cannot be created.
    pub fn new(scenario: &Scenario, config: HeadlessConfig) -> GameResult<Self> {
        let progress: Box<dyn ProgressStore> = match &config.progress_path {
            Some(path) => Box::new(RonProgressFile::new(path)),
            None => Box::new(MemoryProgress::new()),
        };
        let controller = MatchController::new(
            scenario.config.clone(),
            Box::new(scenario.levels.clone()),
            progress,
            LogSink::collaborators(),
            config.seed,
        )?;
        Ok(Self { controller, config })
    }

    /// The match being driven.
    #[must_use]
    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    /// The greeting sent before any command is read.
    #[must_use]
    pub fn ready(&self) -> Response {
        Response::ready(
            self.controller.simulation().get_tick(),
            self.controller.level_index(),
            self.controller.phase(),
        )
    }

    /// Read commands from `input` until `quit` or end of input, writing
    /// responses to `output`.
    ///
    /// # Errors
    ///
    /// Fails only on I/O errors.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write_response(&mut output, &self.ready())?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let command = match Command::from_json(line) {
                Ok(command) => command,
                Err(e) => {
                    write_response(&mut output, &Response::error(format!("Parse error: {e}"), None))?;
                    continue;
                }
            };

            let quit = command == Command::Quit;
            for response in self.handle(&command) {
                write_response(&mut output, &response)?;
            }
            if quit {
                break;
            }
        }

        tracing::info!(
            tick = self.controller.simulation().get_tick(),
            level = self.controller.level_index(),
            "Headless session ended"
        );
        Ok(())
    }

    /// Execute one command and return the responses to send.
    pub fn handle(&mut self, command: &Command) -> Vec<Response> {
        let name = command.name();
        tracing::debug!(cmd = name, "Command");

        let result = match *command {
            Command::Tick { count } => return self.tick(count),
            Command::Query => return vec![self.state()],
            Command::Hash => {
                return vec![Response::StateHash {
                    tick: self.controller.simulation().get_tick(),
                    hash: self.controller.simulation().state_hash(),
                }]
            }
            Command::Quit => return vec![Response::Bye],
            Command::Resume => self.controller.resume(),
            Command::Pause => self.controller.pause(),
            Command::Select { tower } => self.controller.select_tower(TowerId(tower)),
            Command::Drag { x, y } => self.controller.drag_path(Vec2Fixed::from_f64(x, y)),
            Command::Target { tower } => self.controller.player_selected_target(TowerId(tower)),
            Command::Cancel => {
                self.controller.cancel_selection();
                Ok(())
            }
            Command::Volume { value } => {
                self.controller.set_music_volume(value);
                Ok(())
            }
            Command::Restart => self.controller.restart_level(),
            Command::Reset => self.controller.reset_progress(),
        };

        match result {
            Ok(()) => vec![Response::ack(name)],
            Err(e) => vec![Response::error(e.to_string(), Some(name))],
        }
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        let dt = self.controller.config().tick_duration();
        let mut responses = Vec::new();
        let mut spawned = 0;
        let mut destroyed = 0;
        let mut captures = Vec::new();

        for _ in 0..count {
            let level = self.controller.level_index();
            let events = match self.controller.tick(dt) {
                Ok(events) => events,
                Err(e) => {
                    responses.push(Response::error(e.to_string(), Some("tick")));
                    break;
                }
            };

            spawned += events.spawned.len();
            destroyed += events.destroyed.len();
            captures.extend(events.captures.iter().map(|capture| CaptureState {
                tower: capture.tower.0,
                from: capture.old.to_string(),
                to: capture.new.to_string(),
            }));

            if let Some(result) = events.outcome {
                responses.push(Response::Outcome {
                    level,
                    result,
                    tick: self.controller.simulation().get_tick(),
                });
            }
        }

        responses.insert(
            0,
            Response::TickSummary {
                tick: self.controller.simulation().get_tick(),
                spawned,
                destroyed,
                captures,
            },
        );
        if self.config.auto_state_output {
            responses.push(self.state());
        }
        responses
    }

    fn state(&self) -> Response {
        let sim = self.controller.simulation();
        Response::State {
            tick: sim.get_tick(),
            level: self.controller.level_index(),
            level_count: self.controller.level_count(),
            phase: self.controller.phase(),
            selected: self.controller.selected().map(|id| id.0),
            towers: tower_states(sim),
            units: unit_states(sim),
            hash: sim.state_hash(),
        }
    }

    /// Whether the match is waiting on the menu.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.controller.phase() == MatchPhase::Paused
    }
}

fn tower_states(sim: &Simulation) -> Vec<TowerState> {
    sim.towers()
        .iter()
        .map(|(id, tower)| {
            let (x, y) = tower.position().to_f64();
            TowerState {
                id: id.0,
                faction: tower.faction().to_string(),
                health: tower.health(),
                x,
                y,
                target: tower.target().map(|t| t.0),
            }
        })
        .collect()
}

fn unit_states(sim: &Simulation) -> Vec<UnitState> {
    sim.units()
        .iter()
        .map(|(id, unit)| {
            let (x, y) = unit.position().to_f64();
            UnitState {
                id: id.0,
                faction: unit.faction().to_string(),
                home: unit.home().0,
                target: unit.target().0,
                x,
                y,
            }
        })
        .collect()
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::registry::Outcome;

    fn runner() -> HeadlessRunner {
        let scenario = Scenario::from_ron_str(
            r#"Scenario(
                name: "test",
                config: (warmup_secs: (0.0, 0.0)),
                levels: (levels: [
                    (name: "one", towers: [
                        (faction: Player, position: (0.0, 0.0), spawn_interval: 0.2),
                        (faction: Ai("Red"), position: (5.0, 0.0), health: 1, spawn_interval: 1000.0),
                    ]),
                    (name: "two", towers: [
                        (faction: Player, position: (0.0, 0.0)),
                        (faction: Ai("Red"), position: (30.0, 0.0)),
                    ]),
                ]),
            )"#,
        )
        .unwrap();
        HeadlessRunner::new(&scenario, HeadlessConfig::default()).unwrap()
    }

    fn session(runner: &mut HeadlessRunner, commands: &[&str]) -> Vec<Response> {
        let input = commands.join("\n");
        let mut output = Vec::new();
        runner.run(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_starts_with_ready_on_the_menu() {
        let mut runner = runner();
        let responses = session(&mut runner, &[]);
        assert_eq!(responses, vec![Response::ready(0, 0, MatchPhase::Paused)]);
    }

    #[test]
    fn test_paused_tick_does_not_advance() {
        let mut runner = runner();
        let responses = runner.handle(&Command::Tick { count: 5 });
        assert!(matches!(responses[0], Response::TickSummary { tick: 0, .. }));
    }

    #[test]
    fn test_selecting_while_paused_is_an_error() {
        let mut runner = runner();
        let responses = runner.handle(&Command::Select { tower: 1 });
        assert!(matches!(
            &responses[0],
            Response::Error { cmd: Some(cmd), .. } if cmd == "select"
        ));
    }

    #[test]
    fn test_player_orders_win_the_level() {
        let mut runner = runner();
        let responses = session(
            &mut runner,
            &[
                r#"{"cmd":"resume"}"#,
                r#"{"cmd":"select","tower":1}"#,
                r#"{"cmd":"target","tower":2}"#,
                r#"{"cmd":"tick","count":100}"#,
                r#"{"cmd":"quit"}"#,
            ],
        );

        assert_eq!(responses[1], Response::ack("resume"));
        assert_eq!(responses[2], Response::ack("select"));
        assert_eq!(responses[3], Response::ack("target"));
        assert!(responses.iter().any(|r| matches!(
            r,
            Response::Outcome {
                level: 0,
                result: Outcome::Won,
                ..
            }
        )));
        assert_eq!(responses.last(), Some(&Response::Bye));
        assert_eq!(runner.controller().level_index(), 1);
        assert!(runner.is_paused());
    }

    #[test]
    fn test_bad_json_reports_parse_error_and_continues() {
        let mut runner = runner();
        let responses = session(&mut runner, &["{not json", r#"{"cmd":"hash"}"#]);
        assert!(matches!(responses[1], Response::Error { cmd: None, .. }));
        assert!(matches!(responses[2], Response::StateHash { tick: 0, .. }));
    }

    #[test]
    fn test_query_lists_towers() {
        let mut runner = runner();
        let responses = runner.handle(&Command::Query);
        let Response::State { towers, units, .. } = &responses[0] else {
            panic!("expected state, got {responses:?}");
        };
        assert_eq!(towers.len(), 2);
        assert_eq!(towers[0].faction, "Player");
        assert!(units.is_empty());
    }
}
