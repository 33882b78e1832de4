//! GTP (Go Text Protocol) engine driver.
//!
//! This crate runs an external Go engine as a child process and talks to it
//! over GTP, using it as an analysis oracle rather than an opponent.
//!
//! # Commands used
//!
//! - `boardsize`, `komi`, `time_settings` - Session setup
//! - `clear_board`, `play <color> <vertex>` - Position replay
//! - `time_left`, `genmove <color>` - Timed search
//! - `showboard` - Diagnostic board dump
//! - `quit` - Shutdown
//!
//! Every successful GTP reply contains a line with `=`. The search details
//! the analysis is built from are printed by the engine on stderr and are
//! turned into an [`AnalysisResult`] by a [`ResultParser`].

mod analysis;
pub mod parser;
mod reader;
mod session;

pub use analysis::{AnalysisResult, AnalysisStats, Candidate, StatusUpdate};
pub use parser::{EngineKind, ParseContext, ResultParser};
pub use reader::PipeReader;
pub use session::{
    EngineSession, HistoryEntry, SearchOutput, SessionConfig, SessionState, DEFAULT_PROTOCOL_TIMEOUT,
};

use go_core::CoordinateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GtpError {
    #[error("no reply to '{command}' after {tries} polls")]
    ProtocolTimeout { command: String, tries: u64 },
    #[error("engine process error: {0}")]
    Process(#[from] std::io::Error),
    #[error("engine process exited unexpectedly ({0})")]
    EngineCrash(String),
    #[error("engine is not running")]
    NotRunning,
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}
