//! # Conquest Core
//!
//! Deterministic simulation core for Tower Conquest.
//!
//! This crate contains **only** game logic:
//! - No rendering, audio or UI (see [`collaborators`])
//! - No system randomness (one seeded [`rng::SimRng`] per match)
//! - No floating-point math in world state (uses fixed-point)
//!
//! This separation enables:
//! - Headless runners and batch simulation
//! - Determinism testing via [`simulation::Simulation::state_hash`]
//!
//! ## Crate Structure
//!
//! - [`tower`] - Capturable spawners
//! - [`unit`] - Mobile agents
//! - [`registry`] - Faction → towers bookkeeping and win/lose evaluation
//! - [`contacts`] - Overlap-enter detection
//! - [`simulation`] - The world of one level and its tick
//! - [`match_controller`] - Phases, level transitions and player input
//! - [`level`], [`config`], [`progress`] - Data loading and persistence
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod collaborators;
pub mod components;
pub mod config;
pub mod contacts;
pub mod error;
pub mod factions;
pub mod level;
pub mod match_controller;
pub mod math;
pub mod progress;
pub mod registry;
pub mod rng;
pub mod simulation;
pub mod tower;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::collaborators::{
        AudioCue, AudioSink, Collaborators, Hud, NullAudio, NullHud, NullPresentation,
        Presentation,
    };
    pub use crate::components::*;
    pub use crate::config::MatchConfig;
    pub use crate::error::{GameError, Result};
    pub use crate::factions::FactionTag;
    pub use crate::level::{LevelData, LevelSet, LevelSource, TowerPlacement};
    pub use crate::match_controller::{MatchController, MatchPhase};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::progress::{MemoryProgress, ProgressStore, RonProgressFile};
    pub use crate::registry::{FactionRegistry, Outcome};
    pub use crate::rng::SimRng;
    pub use crate::simulation::{Simulation, TickEvents};
    pub use crate::tower::{Attacker, Tower, TowerParams};
    pub use crate::unit::Unit;
}
