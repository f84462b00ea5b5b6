//! Collaborators for running without a screen or speakers.
//!
//! Everything the game would draw or play is written to the log instead.

use conquest_core::collaborators::{AudioCue, AudioSink, Collaborators, Hud, Presentation};
use conquest_core::components::{Appearance, EntityRef, TowerId, UnitId};
use conquest_core::math::Vec2Fixed;

/// Presentation, audio and HUD that log at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    /// One sink behind every collaborator seam.
    #[must_use]
    pub fn collaborators() -> Collaborators {
        Collaborators::new(Self, Self, Self)
    }
}

impl Presentation for LogSink {
    fn set_path_endpoint(&mut self, source: EntityRef, position: Vec2Fixed) {
        let (x, y) = position.to_f64();
        tracing::trace!(source = ?source, x, y, "Path endpoint");
    }

    fn clear_path(&mut self, source: EntityRef) {
        tracing::trace!(source = ?source, "Path cleared");
    }

    fn unit_destroyed(&mut self, unit: UnitId, position: Vec2Fixed) {
        let (x, y) = position.to_f64();
        tracing::trace!(unit = %unit, x, y, "Smoke");
    }

    fn tower_recolored(&mut self, tower: TowerId, appearance: Option<&Appearance>) {
        tracing::trace!(
            tower = %tower,
            material = appearance.map_or("none", |a| a.material.as_str()),
            "Tower recolored"
        );
    }
}

impl AudioSink for LogSink {
    fn play(&mut self, cue: AudioCue, looping: bool) {
        tracing::trace!(cue = ?cue, looping, "Play");
    }

    fn stop(&mut self, cue: AudioCue) {
        tracing::trace!(cue = ?cue, "Stop");
    }

    fn set_volume(&mut self, volume: f64) {
        tracing::trace!(volume, "Volume");
    }
}

impl Hud for LogSink {
    fn show_status(&mut self, text: &str) {
        tracing::debug!(status = text, "Status");
    }

    fn set_menu_visible(&mut self, visible: bool) {
        tracing::trace!(visible, "Menu");
    }

    fn set_tower_health(&mut self, tower: TowerId, health: i32) {
        tracing::trace!(tower = %tower, health, "Tower health");
    }
}
