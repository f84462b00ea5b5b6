//! Match controller: phases, level transitions and player input.
//!
//! Phase machine:
//!
//! ```text
//! Paused (menu) --resume--> Running --outcome--> Lost | Won
//!     ^                                            |
//!     +------ outcome delay, restart / next -------+
//! ```
//!
//! While `Lost` or `Won` the world is frozen; only the outcome countdown
//! advances and no further outcome is evaluated. Every level transition
//! ends in `Paused` with the menu shown.

use serde::{Deserialize, Serialize};

use crate::collaborators::{AudioCue, Collaborators};
use crate::components::{Countdown, EntityRef, TowerId};
use crate::config::MatchConfig;
use crate::error::{GameError, Result};
use crate::level::LevelSource;
use crate::math::{Fixed, Vec2Fixed};
use crate::progress::{clamp_level_index, ProgressStore};
use crate::registry::Outcome;
use crate::rng::SimRng;
use crate::simulation::{Simulation, TickEvents};

/// Where the match is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Menu shown, world not advancing.
    Paused,
    /// World advancing.
    Running,
    /// Player lost; waiting to restart the level.
    Lost,
    /// Player won; waiting to advance to the next level.
    Won,
}

/// Owns the current level and drives it.
pub struct MatchController {
    sim: Simulation,
    rng: SimRng,
    config: MatchConfig,
    levels: Box<dyn LevelSource>,
    progress: Box<dyn ProgressStore>,
    collaborators: Collaborators,
    phase: MatchPhase,
    level_index: usize,
    outcome_timer: Option<Countdown>,
    selected: Option<TowerId>,
    music_volume: f64,
}

impl std::fmt::Debug for MatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchController")
            .field("phase", &self.phase)
            .field("level_index", &self.level_index)
            .field("tick", &self.sim.get_tick())
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl MatchController {
    /// Load the stored level (or level 0 when the stored index is missing
    /// or out of range) and start paused on the menu.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, there are no levels, or the
    /// level cannot be built.
    pub fn new(
        config: MatchConfig,
        levels: Box<dyn LevelSource>,
        mut progress: Box<dyn ProgressStore>,
        collaborators: Collaborators,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let count = levels.level_count();
        if count == 0 {
            return Err(GameError::NoLevels);
        }

        let stored = progress.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Could not read progress; starting at level 1");
            None
        });
        let level_index = clamp_level_index(stored, count);
        if stored.is_some_and(|value| usize::try_from(value).ok() != Some(level_index)) {
            tracing::info!(stored = ?stored, levels = count, "Stored level out of range; resetting");
            if let Err(err) = progress.save(level_index) {
                tracing::warn!(error = %err, "Could not save progress");
            }
        }

        let music_volume = config.music_volume;
        let mut controller = Self {
            sim: Simulation::new(),
            rng: SimRng::from_seed(seed),
            config,
            levels,
            progress,
            collaborators,
            phase: MatchPhase::Paused,
            level_index,
            outcome_timer: None,
            selected: None,
            music_volume,
        };
        controller.collaborators.audio.set_volume(music_volume);
        controller.load_current_level()?;
        controller.enter_paused();
        Ok(controller)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Index of the level being played.
    #[must_use]
    pub const fn level_index(&self) -> usize {
        self.level_index
    }

    /// Number of available levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.level_count()
    }

    /// The world of the current level.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Match tuning.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Player tower currently being dragged from, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<TowerId> {
        self.selected
    }

    /// Current music volume.
    #[must_use]
    pub const fn music_volume(&self) -> f64 {
        self.music_volume
    }

    /// Seed of the match RNG.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Seconds left before the pending level transition, while `Lost`/`Won`.
    #[must_use]
    pub fn outcome_remaining(&self) -> Option<Fixed> {
        self.outcome_timer.map(|timer| timer.remaining())
    }

    /// Leave the menu and start playing.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] unless the match is paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.phase != MatchPhase::Paused {
            return Err(GameError::InvalidState(format!(
                "cannot resume while {:?}",
                self.phase
            )));
        }
        self.phase = MatchPhase::Running;
        let status = self.level_status();
        let collaborators = &mut self.collaborators;
        collaborators.hud.show_status(&status);
        collaborators.hud.set_menu_visible(false);
        collaborators.audio.play(AudioCue::Game, true);
        collaborators.audio.play(AudioCue::Battle, true);
        tracing::info!(level = self.level_index, "Match resumed");
        Ok(())
    }

    /// Stop the world and show the menu.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] while an outcome is pending.
    pub fn pause(&mut self) -> Result<()> {
        match self.phase {
            MatchPhase::Running | MatchPhase::Paused => {
                self.enter_paused();
                Ok(())
            }
            MatchPhase::Lost | MatchPhase::Won => Err(GameError::InvalidState(format!(
                "cannot pause while {:?}",
                self.phase
            ))),
        }
    }

    /// Advance the match by `dt` seconds.
    ///
    /// Returns the world's events for this tick; empty unless running.
    ///
    /// # Errors
    ///
    /// Fails only if a level transition cannot load its level.
    pub fn tick(&mut self, dt: Fixed) -> Result<TickEvents> {
        match self.phase {
            MatchPhase::Paused => Ok(TickEvents::default()),
            MatchPhase::Lost | MatchPhase::Won => {
                let finished = self
                    .outcome_timer
                    .as_mut()
                    .map_or(true, |timer| timer.tick(dt));
                if finished {
                    self.finish_outcome()?;
                }
                Ok(TickEvents::default())
            }
            MatchPhase::Running => {
                let events = self.sim.tick(dt, &mut self.rng, &self.config);
                self.dispatch(&events);
                if let Some(outcome) = events.outcome {
                    self.enter_outcome(outcome);
                }
                Ok(events)
            }
        }
    }

    /// Start dragging a path from one of the player's towers.
    ///
    /// # Errors
    ///
    /// The match must be running and the tower must exist and belong to the
    /// player.
    pub fn select_tower(&mut self, tower: TowerId) -> Result<()> {
        self.require_running()?;
        let faction = self
            .sim
            .tower(tower)
            .ok_or(GameError::TowerNotFound(tower))?
            .faction();
        if !faction.is_player() {
            return Err(GameError::NotPlayerTower(tower));
        }
        self.selected = Some(tower);
        tracing::debug!(tower = %tower, "Tower selected");
        Ok(())
    }

    /// Stretch the selected tower's path line to an arbitrary point.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if no tower is selected.
    pub fn drag_path(&mut self, position: Vec2Fixed) -> Result<()> {
        let tower = self
            .selected
            .ok_or_else(|| GameError::InvalidState("no tower selected".into()))?;
        self.collaborators
            .presentation
            .set_path_endpoint(EntityRef::Tower(tower), position);
        Ok(())
    }

    /// Point the selected tower at `target` and end the selection.
    ///
    /// If the target does not exist the path line is cleared instead.
    ///
    /// # Errors
    ///
    /// Fails if nothing is selected, the selected tower is no longer the
    /// player's, or the target does not exist.
    pub fn player_selected_target(&mut self, target: TowerId) -> Result<()> {
        self.require_running()?;
        let tower = self
            .selected
            .take()
            .ok_or_else(|| GameError::InvalidState("no tower selected".into()))?;

        let still_owned = self
            .sim
            .tower(tower)
            .is_some_and(|source| source.faction().is_player());
        if !still_owned {
            self.collaborators
                .presentation
                .clear_path(EntityRef::Tower(tower));
            return Err(GameError::NotPlayerTower(tower));
        }

        match self.sim.set_tower_target(tower, target) {
            Ok(_) => {
                if let Some(position) = self.sim.tower(target).map(|t| t.position()) {
                    self.collaborators
                        .presentation
                        .set_path_endpoint(EntityRef::Tower(tower), position);
                }
                tracing::info!(tower = %tower, target = %target, "Player set target");
                Ok(())
            }
            Err(err) => {
                self.collaborators
                    .presentation
                    .clear_path(EntityRef::Tower(tower));
                Err(err)
            }
        }
    }

    /// Abort a drag; the path line is cleared.
    pub fn cancel_selection(&mut self) {
        if let Some(tower) = self.selected.take() {
            self.collaborators
                .presentation
                .clear_path(EntityRef::Tower(tower));
        }
    }

    /// Tear down and reload the current level, then pause.
    ///
    /// # Errors
    ///
    /// Fails if the level cannot be built.
    pub fn restart_level(&mut self) -> Result<()> {
        self.load_current_level()?;
        self.enter_paused();
        Ok(())
    }

    /// Advance to the next level (wrapping after the last), save progress,
    /// then pause.
    ///
    /// # Errors
    ///
    /// Fails if the level cannot be built.
    pub fn next_level(&mut self) -> Result<()> {
        let count = self.levels.level_count().max(1);
        self.level_index = (self.level_index + 1) % count;
        self.save_progress();
        self.restart_level()
    }

    /// Go back to the first level and forget saved progress.
    ///
    /// # Errors
    ///
    /// Fails if the level cannot be built.
    pub fn reset_progress(&mut self) -> Result<()> {
        self.level_index = 0;
        self.save_progress();
        self.restart_level()
    }

    /// Set the music volume, clamped to `[0, 1]`.
    pub fn set_music_volume(&mut self, volume: f64) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.music_volume = volume;
        self.collaborators.audio.set_volume(volume);
    }

    fn require_running(&self) -> Result<()> {
        if self.phase == MatchPhase::Running {
            Ok(())
        } else {
            Err(GameError::InvalidState(format!(
                "input ignored while {:?}",
                self.phase
            )))
        }
    }

    fn level_status(&self) -> String {
        format!("Level {}", self.level_index + 1)
    }

    fn save_progress(&mut self) {
        if let Err(err) = self.progress.save(self.level_index) {
            tracing::warn!(error = %err, level = self.level_index, "Could not save progress");
        }
    }

    fn load_current_level(&mut self) -> Result<()> {
        self.sim.clear();
        self.selected = None;
        self.outcome_timer = None;

        let level = self.levels.load_level(self.level_index)?;
        self.sim = Simulation::from_level(&level, &mut self.rng, &self.config)?;

        let status = self.level_status();
        let collaborators = &mut self.collaborators;
        collaborators.hud.show_status(&status);
        for (&id, tower) in self.sim.towers().iter() {
            collaborators.hud.set_tower_health(id, tower.health());
            collaborators
                .presentation
                .tower_recolored(id, tower.appearance());
            let endpoint = tower
                .target()
                .and_then(|target| self.sim.tower(target))
                .map(|target| target.position());
            match endpoint {
                Some(position) => collaborators
                    .presentation
                    .set_path_endpoint(EntityRef::Tower(id), position),
                None => collaborators.presentation.clear_path(EntityRef::Tower(id)),
            }
        }

        tracing::info!(
            level = self.level_index,
            name = %level.name,
            towers = self.sim.towers().len(),
            "Level loaded"
        );
        Ok(())
    }

    fn enter_paused(&mut self) {
        self.phase = MatchPhase::Paused;
        self.collaborators.hud.set_menu_visible(true);
        self.collaborators.audio.play(AudioCue::Menu, true);
        self.collaborators.audio.stop(AudioCue::Battle);
        tracing::debug!(level = self.level_index, "Match paused");
    }

    fn enter_outcome(&mut self, outcome: Outcome) {
        let (phase, status, cue) = match outcome {
            Outcome::Lost => (MatchPhase::Lost, "You Lose!", AudioCue::Lose),
            Outcome::Won => (MatchPhase::Won, "You Won!", AudioCue::Win),
        };
        self.phase = phase;
        self.selected = None;
        self.collaborators.hud.show_status(status);
        self.collaborators.audio.play(cue, false);
        self.outcome_timer = Some(Countdown::new(Fixed::from_num(
            self.config.outcome_delay_secs,
        )));
        tracing::info!(
            level = self.level_index,
            outcome = ?outcome,
            tick = self.sim.get_tick(),
            "Match decided"
        );
    }

    fn finish_outcome(&mut self) -> Result<()> {
        match self.phase {
            MatchPhase::Lost => self.restart_level(),
            MatchPhase::Won => self.next_level(),
            MatchPhase::Paused | MatchPhase::Running => Ok(()),
        }
    }

    fn dispatch(&mut self, events: &TickEvents) {
        let presentation = &mut self.collaborators.presentation;

        for change in &events.target_changes {
            let source = EntityRef::Tower(change.tower);
            let endpoint = change
                .target
                .and_then(|target| self.sim.tower(target))
                .map(|target| target.position());
            match endpoint {
                Some(position) => presentation.set_path_endpoint(source, position),
                None => presentation.clear_path(source),
            }
        }

        for capture in &events.captures {
            let appearance = self.sim.tower(capture.tower).and_then(|t| t.appearance());
            presentation.tower_recolored(capture.tower, appearance);
            if self.selected == Some(capture.tower) && !capture.new.is_player() {
                self.selected = None;
            }
        }

        for destroyed in &events.destroyed {
            presentation.unit_destroyed(destroyed.unit, destroyed.position);
        }

        for change in &events.tower_health {
            self.collaborators
                .hud
                .set_tower_health(change.tower, change.health);
        }
    }
}
