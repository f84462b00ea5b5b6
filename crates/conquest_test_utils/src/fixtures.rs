//! Test fixtures and helpers.
//!
//! Pre-built levels, configurations and recording collaborators for
//! consistent testing.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use conquest_core::collaborators::{AudioCue, AudioSink, Collaborators, Hud, Presentation};
use conquest_core::components::{Appearance, EntityRef, TowerId, UnitId};
use conquest_core::config::MatchConfig;
use conquest_core::error::Result;
use conquest_core::factions::FactionTag;
use conquest_core::level::{LevelData, LevelSet, TowerPlacement};
use conquest_core::math::{Fixed, Vec2Fixed};
use conquest_core::progress::ProgressStore;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// Config without warm-up, so towers start spawning on the first tick.
#[must_use]
pub fn instant_config() -> MatchConfig {
    MatchConfig {
        warmup_secs: (0.0, 0.0),
        ..MatchConfig::default()
    }
}

/// Appearance named after the faction.
#[must_use]
pub fn appearance_for(faction: &FactionTag) -> Appearance {
    let color = match faction {
        FactionTag::Player => [40, 90, 220],
        FactionTag::Neutral => [128, 128, 128],
        FactionTag::Ai(_) => [200, 50, 40],
    };
    Appearance::new(faction.to_string(), color)
}

/// A tower placement with an appearance matching its faction.
#[must_use]
pub fn tower(faction: FactionTag, x: f64, y: f64) -> TowerPlacement {
    let appearance = appearance_for(&faction);
    TowerPlacement {
        appearance: Some(appearance),
        ..TowerPlacement::new(faction, x, y)
    }
}

/// A level from placements.
#[must_use]
pub fn level(name: &str, towers: Vec<TowerPlacement>) -> LevelData {
    LevelData {
        name: name.to_string(),
        towers,
    }
}

/// Player tower at the origin targeting a Red tower 20 units east.
#[must_use]
pub fn duel_level() -> LevelData {
    let mut player = tower(FactionTag::Player, 0.0, 0.0);
    player.target = Some(1);
    level("Duel", vec![player, tower(FactionTag::ai("Red"), 20.0, 0.0)])
}

/// Player, Red and Blue towers plus one neutral tower in the middle.
#[must_use]
pub fn skirmish_level() -> LevelData {
    level(
        "Skirmish",
        vec![
            tower(FactionTag::Player, 0.0, 0.0),
            tower(FactionTag::ai("Red"), 30.0, 0.0),
            tower(FactionTag::ai("Blue"), 15.0, 25.0),
            tower(FactionTag::Neutral, 15.0, 8.0),
        ],
    )
}

/// Level where the player's only tower has 1 health and sits next to a Red
/// tower that spawns almost immediately.
#[must_use]
pub fn doomed_level() -> LevelData {
    let mut player = tower(FactionTag::Player, 0.0, 0.0);
    player.health = 1;
    player.spawn_interval = 1000.0;
    let mut red = tower(FactionTag::ai("Red"), 4.0, 0.0);
    red.spawn_interval = 0.1;
    level("Doomed", vec![player, red])
}

/// Level the player wins as soon as one unit reaches the enemy.
#[must_use]
pub fn easy_win_level() -> LevelData {
    let mut player = tower(FactionTag::Player, 0.0, 0.0);
    player.spawn_interval = 0.1;
    player.target = Some(1);
    let mut red = tower(FactionTag::ai("Red"), 4.0, 0.0);
    red.health = 1;
    red.spawn_interval = 1000.0;
    level("Easy", vec![player, red])
}

/// A level set from levels.
#[must_use]
pub fn level_set(levels: Vec<LevelData>) -> LevelSet {
    LevelSet { levels }
}

/// Serialize a level set to `levels.ron` inside `dir` and return the path.
///
/// # Panics
///
/// Panics if the set cannot be serialized or written.
pub fn write_level_file(dir: &Path, levels: &LevelSet) -> PathBuf {
    let path = dir.join("levels.ron");
    let text = ron::ser::to_string_pretty(levels, ron::ser::PrettyConfig::default())
        .expect("level set serializes");
    std::fs::write(&path, text).expect("level file is writable");
    path
}

/// In-memory progress whose handle can be kept by the test after the store
/// has been handed to a controller.
#[derive(Debug, Clone, Default)]
pub struct SharedProgress {
    value: Rc<RefCell<Option<i64>>>,
    saves: Rc<RefCell<usize>>,
}

impl SharedProgress {
    /// Start with `value` stored.
    #[must_use]
    pub fn with_value(value: Option<i64>) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            saves: Rc::default(),
        }
    }

    /// Currently stored value.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        *self.value.borrow()
    }

    /// Number of saves so far.
    #[must_use]
    pub fn saves(&self) -> usize {
        *self.saves.borrow()
    }
}

impl ProgressStore for SharedProgress {
    fn load(&mut self) -> Result<Option<i64>> {
        Ok(self.value())
    }

    fn save(&mut self, level: usize) -> Result<()> {
        *self.value.borrow_mut() = i64::try_from(level).ok();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `Presentation::set_path_endpoint`.
    PathEndpoint(EntityRef, Vec2Fixed),
    /// `Presentation::clear_path`.
    ClearPath(EntityRef),
    /// `Presentation::unit_destroyed`.
    UnitDestroyed(UnitId, Vec2Fixed),
    /// `Presentation::tower_recolored`, with the material name.
    TowerRecolored(TowerId, Option<String>),
    /// `AudioSink::play`.
    Play(AudioCue, bool),
    /// `AudioSink::stop`.
    Stop(AudioCue),
    /// `AudioSink::set_volume`.
    Volume(f64),
    /// `Hud::show_status`.
    Status(String),
    /// `Hud::set_menu_visible`.
    Menu(bool),
    /// `Hud::set_tower_health`.
    TowerHealth(TowerId, i32),
}

/// Shared log of collaborator calls, in call order.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<Call>>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    /// Every recorded call.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Most recent status text.
    #[must_use]
    pub fn last_status(&self) -> Option<String> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            Call::Status(text) => Some(text.clone()),
            _ => None,
        })
    }

    /// Most recent menu visibility.
    #[must_use]
    pub fn menu_visible(&self) -> Option<bool> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            Call::Menu(visible) => Some(*visible),
            _ => None,
        })
    }

    /// Whether `call` was recorded.
    #[must_use]
    pub fn contains(&self, call: &Call) -> bool {
        self.calls.borrow().contains(call)
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }
}

/// Presentation, audio and HUD that write into a [`CallLog`].
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: CallLog,
}

impl Presentation for Recorder {
    fn set_path_endpoint(&mut self, source: EntityRef, position: Vec2Fixed) {
        self.log.push(Call::PathEndpoint(source, position));
    }

    fn clear_path(&mut self, source: EntityRef) {
        self.log.push(Call::ClearPath(source));
    }

    fn unit_destroyed(&mut self, unit: UnitId, position: Vec2Fixed) {
        self.log.push(Call::UnitDestroyed(unit, position));
    }

    fn tower_recolored(&mut self, tower: TowerId, appearance: Option<&Appearance>) {
        self.log.push(Call::TowerRecolored(
            tower,
            appearance.map(|a| a.material.clone()),
        ));
    }
}

impl AudioSink for Recorder {
    fn play(&mut self, cue: AudioCue, looping: bool) {
        self.log.push(Call::Play(cue, looping));
    }

    fn stop(&mut self, cue: AudioCue) {
        self.log.push(Call::Stop(cue));
    }

    fn set_volume(&mut self, volume: f64) {
        self.log.push(Call::Volume(volume));
    }
}

impl Hud for Recorder {
    fn show_status(&mut self, text: &str) {
        self.log.push(Call::Status(text.to_string()));
    }

    fn set_menu_visible(&mut self, visible: bool) {
        self.log.push(Call::Menu(visible));
    }

    fn set_tower_health(&mut self, tower: TowerId, health: i32) {
        self.log.push(Call::TowerHealth(tower, health));
    }
}

/// Collaborators that all record into one shared log.
#[must_use]
pub fn recording_collaborators() -> (Collaborators, CallLog) {
    let recorder = Recorder::default();
    let log = recorder.log.clone();
    let collaborators = Collaborators::new(recorder.clone(), recorder.clone(), recorder);
    (collaborators, log)
}
