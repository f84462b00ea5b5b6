//! Headless match runner for AI testing and CI verification.
//!
//! This crate runs Tower Conquest without graphics. It can be driven two
//! ways:
//!
//! - **Protocol**: JSON commands on stdin, responses on stdout, so an
//!   external agent can play the game
//! - **Auto-player**: a built-in [`strategies::Strategy`] stands in for the
//!   human, for single games or parallel batches with collected metrics
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, select, target, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! echo '{"cmd":"resume"}' | cargo run -p conquest_headless
//! cargo run -p conquest_headless -- batch --count 100 --strategy weakest
//! ```

pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod sinks;
pub mod strategies;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use game_runner::{run_game, GameConfig, GameResult};
pub use metrics::{BatchSummary, GameMetrics};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::Scenario;
pub use sinks::LogSink;
pub use strategies::{Strategy, StrategyExecutor};
