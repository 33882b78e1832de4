//! Structured results of one engine analysis call.
//!
//! All winrates are stored from Black's perspective, whichever side was to
//! move when the engine produced them. Positions are SGF point codes, with
//! the empty string standing for a pass.

use go_core::Color;
use serde::{Deserialize, Serialize};

/// Summary statistics for the analyzed position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Total visits of the search.
    pub visits: Option<u64>,
    /// Black winrate of the best move (0.0 - 1.0).
    pub winrate: Option<f64>,
    /// Move the engine considers best.
    pub best: Option<String>,
    /// Move the engine actually chose with `genmove`.
    pub chosen: Option<String>,
    /// Number of opening book moves considered, when the move came from the book.
    pub book_moves: Option<u32>,
    /// Number of book positions, when the move came from the book.
    pub book_positions: Option<u32>,
    /// Score estimate such as `B+3.5`.
    pub margin: Option<String>,
    /// Black winrate according to Monte-Carlo rollouts.
    pub mc_winrate: Option<f64>,
    /// Black winrate according to the value network.
    pub nn_winrate: Option<f64>,
}

impl AnalysisStats {
    /// Returns true when the engine answered from its opening book.
    pub fn is_book(&self) -> bool {
        self.book_moves.is_some()
    }
}

/// One candidate move considered by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// SGF point code of the move.
    pub pos: String,
    /// Visits spent on this move.
    pub visits: u64,
    /// Black winrate after this move.
    pub winrate: f64,
    /// Prior probability from the policy network (0.0 - 1.0).
    pub policy_prob: f64,
    /// Principal variation starting with this move, as SGF point codes.
    pub pv: Vec<String>,
    /// Color playing this move.
    pub color: Option<Color>,
    /// True for the placeholder candidate of a book move.
    pub is_book: bool,
    pub mc_winrate: Option<f64>,
    pub nn_winrate: Option<f64>,
}

impl Candidate {
    /// Placeholder candidate standing for a move taken from the opening book.
    pub fn book(pos: impl Into<String>) -> Self {
        Self {
            pos: pos.into(),
            is_book: true,
            ..Self::default()
        }
    }
}

/// Result of one analysis call: summary statistics plus the candidate list,
/// best move first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub stats: AnalysisStats,
    pub candidates: Vec<Candidate>,
}

impl AnalysisResult {
    /// Returns true when the position is still inside the engine's opening book.
    pub fn is_book(&self) -> bool {
        self.stats.is_book()
    }

    /// The first-ranked candidate, if any.
    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Live progress reported by the engine while it searches.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub visits: u64,
    /// Black winrate.
    pub winrate: f64,
    /// Current principal variation as SGF point codes.
    pub pv: Vec<String>,
}
