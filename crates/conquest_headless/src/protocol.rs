//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Player input and control commands
//! **Output (stdout):** Responses and state snapshots
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with one or more responses
//! 4. When a level is decided, an `outcome` response is emitted
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"level":0,"phase":"paused"}
//! -> {"cmd":"resume"}
//! <- {"type":"ack","cmd":"resume"}
//! -> {"cmd":"select","tower":1}
//! <- {"type":"ack","cmd":"select"}
//! -> {"cmd":"target","tower":2}
//! <- {"type":"ack","cmd":"target"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"tick_summary","tick":60,"spawned":3,"destroyed":1,"captures":[]}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":60,"phase":"running",...}
//! ```

use conquest_core::match_controller::MatchPhase;
use conquest_core::registry::Outcome;
use serde::{Deserialize, Serialize};

/// Protocol version announced in the ready message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the match by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current state without advancing time.
    Query,

    /// Leave the menu and start playing.
    Resume,

    /// Show the menu and stop the world.
    Pause,

    /// Start dragging a path from a player tower.
    Select { tower: u64 },

    /// Stretch the selected tower's path to a point.
    Drag { x: f64, y: f64 },

    /// Release the drag on a tower.
    Target { tower: u64 },

    /// Abort the drag.
    Cancel,

    /// Set the music volume.
    Volume { value: f64 },

    /// Reload the current level.
    Restart,

    /// Go back to the first level.
    Reset,

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        tick: u64,
        level: usize,
        phase: MatchPhase,
    },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// What happened during a `tick` command.
    TickSummary {
        tick: u64,
        spawned: usize,
        destroyed: usize,
        captures: Vec<CaptureState>,
    },

    /// A level was decided.
    Outcome {
        level: usize,
        result: Outcome,
        tick: u64,
    },

    /// Current match state.
    State {
        tick: u64,
        level: usize,
        level_count: usize,
        phase: MatchPhase,
        selected: Option<u64>,
        towers: Vec<TowerState>,
        units: Vec<UnitState>,
        hash: u64,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// State of a single tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerState {
    pub id: u64,
    pub faction: String,
    pub health: i32,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
}

/// State of a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u64,
    pub faction: String,
    pub home: u64,
    pub target: u64,
    pub x: f64,
    pub y: f64,
}

/// A tower changing hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureState {
    pub tower: u64,
    pub from: String,
    pub to: String,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64, level: usize, phase: MatchPhase) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            level,
            phase,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Resume => "resume",
            Self::Pause => "pause",
            Self::Select { .. } => "select",
            Self::Drag { .. } => "drag",
            Self::Target { .. } => "target",
            Self::Cancel => "cancel",
            Self::Volume { .. } => "volume",
            Self::Restart => "restart",
            Self::Reset => "reset",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
