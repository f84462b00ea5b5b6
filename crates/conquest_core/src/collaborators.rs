//! Interfaces to the presentation side of the game.
//!
//! The core never renders, plays sound or draws UI. It calls into these
//! traits at the points where the game would, and hosts plug in whatever
//! backs them. The `Null*` implementations discard every call.

use crate::components::{Appearance, EntityRef, TowerId, UnitId};
use crate::math::Vec2Fixed;

/// Music and jingle cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AudioCue {
    /// Menu music.
    Menu,
    /// In-game music.
    Game,
    /// Battle layer played on top of the game music.
    Battle,
    /// Victory jingle.
    Win,
    /// Defeat jingle.
    Lose,
}

/// Audio playback.
pub trait AudioSink {
    /// Start a cue, optionally looping.
    fn play(&mut self, cue: AudioCue, looping: bool);

    /// Stop a cue if it is playing.
    fn stop(&mut self, cue: AudioCue);

    /// Set the music volume in `[0, 1]`.
    fn set_volume(&mut self, volume: f64);
}

/// World-space visuals driven by the simulation.
pub trait Presentation {
    /// Stretch the path line of `source` to `position`.
    fn set_path_endpoint(&mut self, source: EntityRef, position: Vec2Fixed);

    /// Hide the path line of `source`.
    fn clear_path(&mut self, source: EntityRef);

    /// Play the transient destruction effect of a unit.
    fn unit_destroyed(&mut self, unit: UnitId, position: Vec2Fixed);

    /// A tower changed hands and should be redrawn with its new look.
    fn tower_recolored(&mut self, tower: TowerId, appearance: Option<&Appearance>);
}

/// Menu overlay, status text and per-tower labels.
pub trait Hud {
    /// Replace the status line.
    fn show_status(&mut self, text: &str);

    /// Show or hide the menu overlay.
    fn set_menu_visible(&mut self, visible: bool);

    /// Refresh the health label of a tower.
    fn set_tower_health(&mut self, tower: TowerId, health: i32);
}

/// Audio sink that plays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: AudioCue, _looping: bool) {}

    fn stop(&mut self, _cue: AudioCue) {}

    fn set_volume(&mut self, _volume: f64) {}
}

/// Presentation that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {
    fn set_path_endpoint(&mut self, _source: EntityRef, _position: Vec2Fixed) {}

    fn clear_path(&mut self, _source: EntityRef) {}

    fn unit_destroyed(&mut self, _unit: UnitId, _position: Vec2Fixed) {}

    fn tower_recolored(&mut self, _tower: TowerId, _appearance: Option<&Appearance>) {}
}

/// HUD that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHud;

impl Hud for NullHud {
    fn show_status(&mut self, _text: &str) {}

    fn set_menu_visible(&mut self, _visible: bool) {}

    fn set_tower_health(&mut self, _tower: TowerId, _health: i32) {}
}

/// The set of collaborators a match talks to.
pub struct Collaborators {
    /// Path lines and effects.
    pub presentation: Box<dyn Presentation>,
    /// Music and jingles.
    pub audio: Box<dyn AudioSink>,
    /// Menu and labels.
    pub hud: Box<dyn Hud>,
}

impl Collaborators {
    /// Bundle three collaborators.
    pub fn new(
        presentation: impl Presentation + 'static,
        audio: impl AudioSink + 'static,
        hud: impl Hud + 'static,
    ) -> Self {
        Self {
            presentation: Box::new(presentation),
            audio: Box::new(audio),
            hud: Box::new(hud),
        }
    }

    /// Collaborators that discard everything (headless play).
    #[must_use]
    pub fn null() -> Self {
        Self::new(NullPresentation, NullAudio, NullHud)
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
