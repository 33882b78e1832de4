//! Conversion of raw engine output into [`AnalysisResult`]s.
//!
//! Engines report their search on stderr in their own free-form format, so
//! each supported engine family gets a [`ResultParser`] implementation. The
//! parser is picked once per session from the configured [`EngineKind`].

mod leela;
mod leela_zero;

pub use leela::LeelaParser;
pub use leela_zero::LeelaZeroParser;

use crate::analysis::{AnalysisResult, AnalysisStats, Candidate, StatusUpdate};
use go_core::{parse_coordinate, Color};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::{debug, warn};

static FINISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"= ([A-Z][0-9]+|resign|pass)").expect("valid regex"));
static BOOK_MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+) book moves, ([0-9]+) total positions").expect("valid regex")
});

/// Supported engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Classic Leela: Monte-Carlo search statistics, opening book.
    #[default]
    Leela,
    /// Leela Zero: neural-network evaluation only.
    LeelaZero,
}

impl EngineKind {
    /// Builds the output parser for this engine family.
    pub fn parser(self) -> Box<dyn ResultParser> {
        match self {
            EngineKind::Leela => Box::new(LeelaParser),
            EngineKind::LeelaZero => Box::new(LeelaZeroParser),
        }
    }

    /// Command-line arguments that put either engine in GTP mode without
    /// pondering. Leela Zero also needs `-w <weights>`, which has no default.
    pub fn default_arguments() -> Vec<String> {
        vec!["--gtp".to_string(), "--noponder".to_string()]
    }
}

/// Summary fields a grammar expects to find in every non-book analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    Visits,
    Winrate,
    Best,
    Margin,
}

impl StatField {
    fn is_missing(self, stats: &AnalysisStats) -> bool {
        match self {
            StatField::Visits => stats.visits.is_none(),
            StatField::Winrate => stats.winrate.is_none(),
            StatField::Best => stats.best.is_none(),
            StatField::Margin => stats.margin.is_none(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            StatField::Visits => "visits",
            StatField::Winrate => "winrate",
            StatField::Best => "best",
            StatField::Margin => "margin",
        }
    }
}

/// Position facts the parser needs to interpret engine output.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext {
    pub board_size: u8,
    /// Color to move in the analyzed position. Engines report winrates from
    /// this side's perspective.
    pub to_move: Color,
}

impl ParseContext {
    /// Converts a winrate of the side to move into Black's perspective.
    pub fn flip_winrate(&self, winrate: f64) -> f64 {
        self.to_move.winrate_for(winrate)
    }

    /// Converts an engine vertex into an SGF code, logging bad input.
    pub fn point(&self, vertex: &str) -> Option<String> {
        match parse_coordinate(vertex, self.board_size) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!("ignoring engine coordinate: {}", e);
                None
            }
        }
    }

    /// Converts a whitespace-separated principal variation.
    pub fn sequence(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter_map(|v| self.point(v))
            .collect()
    }
}

/// Partial results accumulated while scanning output lines.
#[derive(Debug, Default)]
pub struct ParseState {
    pub stats: AnalysisStats,
    pub candidates: Vec<Candidate>,
    /// Set once the search summary separator has been seen.
    pub finished: bool,
    /// Set once the summary statistics line has been consumed.
    pub summarized: bool,
}

/// A grammar for one engine family's analysis output.
pub trait ResultParser: Send {
    /// Short engine family name for log messages.
    fn name(&self) -> &'static str;

    /// Recognises a live progress line printed during the search.
    fn parse_status_update(&self, text: &str, ctx: &ParseContext) -> Option<StatusUpdate>;

    /// Consumes one trimmed stderr line.
    fn parse_line(&self, state: &mut ParseState, line: &str, ctx: &ParseContext);

    /// Fields whose absence is reported as a warning.
    fn required_fields(&self) -> &'static [StatField];

    /// Hook run after every stderr line has been consumed.
    fn complete(&self, _state: &mut ParseState) {}

    /// Converts one analysis call's stdout and stderr into a result.
    fn parse(&self, stdout: &[String], stderr: &[String], ctx: &ParseContext) -> AnalysisResult {
        debug!("{} stdout:\n{}", self.name(), stdout.join("\n"));
        debug!("{} stderr:\n{}", self.name(), stderr.join("\n"));

        let mut state = ParseState::default();
        for line in stderr {
            self.parse_line(&mut state, line.trim(), ctx);
        }
        self.complete(&mut state);
        parse_finished(&mut state, stdout, ctx);

        finalize(state, self.required_fields())
    }
}

/// Reads the opening book summary line shared by both grammars.
pub(crate) fn parse_book_move(state: &mut ParseState, line: &str) -> bool {
    match BOOK_MOVE_RE.captures(line) {
        Some(caps) => {
            state.stats.book_moves = caps[1].parse().ok();
            state.stats.book_positions = caps[2].parse().ok();
            true
        }
        None => false,
    }
}

/// Extracts the move chosen by `genmove` from the `= <move>` reply.
pub(crate) fn parse_finished(state: &mut ParseState, stdout: &[String], ctx: &ParseContext) {
    let joined = stdout.join("\n");
    if let Some(caps) = FINISHED_RE.captures(&joined) {
        state.stats.chosen = match &caps[1] {
            "resign" => Some("resign".to_string()),
            vertex => ctx.point(vertex),
        };
    }
}

/// Parses a percentage such as `52.10` into a fraction.
pub(crate) fn percent(value: &str) -> Option<f64> {
    value
        .trim()
        .replace(' ', "")
        .parse::<f64>()
        .ok()
        .map(|v| v * 0.01)
}

fn finalize(mut state: ParseState, required: &[StatField]) -> AnalysisResult {
    let stats = &mut state.stats;

    if stats.is_book() && state.candidates.is_empty() {
        if let Some(chosen) = &stats.chosen {
            state.candidates.push(Candidate::book(chosen.clone()));
        }
    } else {
        for field in required.iter().filter(|f| f.is_missing(stats)) {
            warn!("analysis stats missing {} data", field.name());
        }
        if stats.chosen.as_deref() == Some("resign") {
            debug!("engine resigned, substituting its best move");
            stats.chosen = stats.best.clone();
        }
    }

    if let Some(best) = stats.best.clone() {
        state
            .candidates
            .sort_by(|a, b| match (a.pos == best, b.pos == best) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => b.visits.cmp(&a.visits),
            });
    }

    AnalysisResult {
        stats: state.stats,
        candidates: state.candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(to_move: Color) -> ParseContext {
        ParseContext {
            board_size: 19,
            to_move,
        }
    }

    fn candidate(pos: &str, visits: u64) -> Candidate {
        Candidate {
            pos: pos.to_string(),
            visits,
            ..Candidate::default()
        }
    }

    #[test]
    fn test_flip_winrate_uses_side_to_move() {
        assert_eq!(ctx(Color::Black).flip_winrate(0.7), 0.7);
        assert!((ctx(Color::White).flip_winrate(0.7) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent("50.00"), Some(0.5));
        assert!((percent("- 12.5").unwrap() + 0.125).abs() < 1e-12);
        assert_eq!(percent("abc"), None);
    }

    #[test]
    fn test_parse_finished_converts_vertex() {
        let mut state = ParseState::default();
        parse_finished(&mut state, &["= Q16".to_string()], &ctx(Color::Black));
        assert_eq!(state.stats.chosen.as_deref(), Some("pd"));

        let mut state = ParseState::default();
        parse_finished(&mut state, &["= pass".to_string()], &ctx(Color::Black));
        assert_eq!(state.stats.chosen.as_deref(), Some(""));
    }

    #[test]
    fn test_finalize_sorts_best_first_then_visits() {
        let mut state = ParseState::default();
        state.stats.best = Some("cc".to_string());
        state.candidates = vec![candidate("aa", 5), candidate("bb", 20), candidate("cc", 1)];

        let result = finalize(state, &[]);
        let order: Vec<&str> = result.candidates.iter().map(|c| c.pos.as_str()).collect();

        assert_eq!(order, vec!["cc", "bb", "aa"]);
    }

    #[test]
    fn test_finalize_substitutes_resignation() {
        let mut state = ParseState::default();
        state.stats.best = Some("dp".to_string());
        state.stats.chosen = Some("resign".to_string());

        let result = finalize(state, &[StatField::Best]);

        assert_eq!(result.stats.chosen.as_deref(), Some("dp"));
    }

    #[test]
    fn test_finalize_book_position_gets_placeholder_candidate() {
        let mut state = ParseState::default();
        state.stats.book_moves = Some(4);
        state.stats.book_positions = Some(120);
        state.stats.chosen = Some("pd".to_string());

        let result = finalize(state, &[StatField::Visits]);

        assert!(result.is_book());
        assert_eq!(result.candidates, vec![Candidate::book("pd")]);
    }

    #[test]
    fn test_engine_kind_selects_grammar() {
        assert_eq!(EngineKind::Leela.parser().name(), "leela");
        assert_eq!(EngineKind::LeelaZero.parser().name(), "leela-zero");
        assert!(EngineKind::default_arguments()
            .contains(&"--gtp".to_string()));
    }
}
