pub mod board;
pub mod challenge;
pub mod clock;
pub mod config;
pub mod enemy;
pub mod error;
pub mod events;
pub mod flow;
pub mod input;
pub mod interference;
pub mod judge;
pub mod logging;
pub mod orchestrator;
pub mod playtest;
pub mod selection;
pub mod serde_secs;

pub use config::RoundConfig;
pub use error::{ConfigError, InvalidChallenge, SelectionError};
pub use events::{RoundEvent, StatusCode};
pub use orchestrator::{Command, FrameInput, Gate, RoundOrchestrator};
