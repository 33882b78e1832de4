//! Engine-driven review of Go game records.
//!
//! This crate turns a GTP engine session into a game reviewer:
//!
//! - [`AnalysisCache`] - Per-position results persisted on disk
//! - [`RetryPolicy`] - Bounded retries around engine calls
//! - [`Analyst`] / [`SessionAnalyst`] - The position-analysis seam
//! - [`variations`] - Best-first exploration of alternative lines
//! - [`annotations`] - Comment, label and marker formatting
//! - [`GameAnalyzer`] - Whole-game review driver
//!
//! # Example
//!
//! ```no_run
//! use go_analysis::{AnalysisCache, AnalysisConfig, GameAnalyzer, GameSettings, SessionAnalyst};
//! use gtp::{EngineKind, EngineSession, SessionConfig};
//!
//! let text = std::fs::read_to_string("game.sgf")?;
//! let mut game = sgf::parse(&text)?;
//! let settings = GameSettings::from_root(game.node(game.root()))?;
//! let config = AnalysisConfig::default();
//!
//! let mut session_config = SessionConfig::new("leelaz", EngineKind::LeelaZero);
//! settings.apply(&mut session_config);
//! let mut session = EngineSession::new(session_config);
//! session.start()?;
//!
//! let cache = AnalysisCache::for_game("checkpoints".as_ref(), "leela-zero", &text)?;
//! let analyst = SessionAnalyst::new(&mut session, &cache, config.retry_policy());
//! let mut analyzer = GameAnalyzer::new(analyst, config);
//! analyzer.review(&mut game, &settings, true, |_| Ok(()), |_| {})?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analyzer;
pub mod annotations;
pub mod cache;
pub mod config;
pub mod retry;
pub mod summary;
pub mod variations;

#[cfg(test)]
mod testing;

pub use analyzer::{GameAnalyzer, GameSettings, ReviewOutcome, ReviewPhase, ReviewProgress};
pub use cache::{AnalysisCache, CacheKey};
pub use config::AnalysisConfig;
pub use retry::RetryPolicy;
pub use summary::{WinratePoint, WinrateSeries};
pub use variations::{Analyst, SessionAnalyst, VariationSettings, VariationTree};

use go_core::CoordinateError;
use gtp::GtpError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reviewing a game.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Error from the engine session.
    #[error("Engine error: {0}")]
    Engine(#[from] GtpError),
    /// A cache entry could not be serialized.
    #[error("Cache error for {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A move could not be translated for the engine.
    #[error("Coordinate error: {0}")]
    Coordinate(#[from] CoordinateError),
    /// Invalid game data was provided.
    #[error("Invalid game data: {0}")]
    InvalidGame(String),
    /// Cache or output file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
