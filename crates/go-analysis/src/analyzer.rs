//! Whole-game review.
//!
//! This module provides the [`GameAnalyzer`], which walks the main line of a
//! game record twice. The first pass analyzes every move in the configured
//! range, measures how much each move lost against the engine's preferred
//! move and annotates the record. The second pass explores alternatives at
//! the positions where a move lost more than the variation threshold.

use crate::annotations::{format_analysis, format_delta_info, format_winrate};
use crate::config::AnalysisConfig;
use crate::summary::WinrateSeries;
use crate::variations::{filter_candidates, Analyst, VariationTree};
use crate::AnalysisError;
use go_core::{convert_coordinate, Color, MAX_BOARD_SIZE};
use gtp::{AnalysisResult, Candidate, SessionConfig};
use sgf::{GameTree, Node, NodeId};
use std::str::FromStr;
use tracing::{error, info, warn};

/// Rules and board settings read from a record's root node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSettings {
    pub board_size: u8,
    pub handicap: u32,
    /// Komi, already adjusted for handicap under Japanese rules.
    pub komi: f64,
    pub japanese_rules: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            board_size: 19,
            handicap: 0,
            komi: 7.5,
            japanese_rules: false,
        }
    }
}

impl GameSettings {
    /// Reads `SZ`, `HA`, `RU` and `KM` from the root node.
    ///
    /// Without `KM`, komi is 0.5 in handicap games, otherwise 6.5 under
    /// Japanese rules and 7.5 under any other rules.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidGame`] for malformed numbers or an
    /// unsupported board size.
    pub fn from_root(root: &Node) -> Result<Self, AnalysisError> {
        let board_size = match root.get("SZ") {
            Some(value) => {
                let size: u8 = parse_number("SZ", value)?;
                if !(2..=MAX_BOARD_SIZE).contains(&size) {
                    return Err(AnalysisError::InvalidGame(format!(
                        "unsupported board size {}",
                        size
                    )));
                }
                if size != 19 {
                    warn!("board size is {}, analysis may be very inaccurate", size);
                }
                size
            }
            None => 19,
        };

        let handicap = match root.get("HA") {
            Some(value) => parse_number("HA", value)?,
            None => 0,
        };

        let japanese_rules = root.get("RU").is_some_and(|rules| {
            matches!(
                rules.trim().to_lowercase().as_str(),
                "jp" | "japanese" | "japan"
            )
        });

        let komi = match root.get("KM") {
            Some(value) => {
                let komi: f64 = parse_number("KM", value)?;
                let komi = (komi * 10.0).round() / 10.0;
                if japanese_rules {
                    komi + f64::from(handicap)
                } else {
                    komi
                }
            }
            None if handicap > 0 => 0.5,
            None if japanese_rules => 6.5,
            None => 7.5,
        };

        Ok(Self {
            board_size,
            handicap,
            komi,
            japanese_rules,
        })
    }

    /// Copies board size, komi and handicap into an engine configuration.
    pub fn apply(&self, config: &mut SessionConfig) {
        config.board_size = self.board_size;
        config.komi = self.komi;
        config.handicap = self.handicap;
    }
}

fn parse_number<T: FromStr>(ident: &str, value: &str) -> Result<T, AnalysisError> {
    value
        .trim()
        .parse()
        .map_err(|_| AnalysisError::InvalidGame(format!("invalid {} value '{}'", ident, value)))
}

/// Which pass of the review is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPhase {
    MainLine,
    Variations,
}

/// Progress reported after every completed analysis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewProgress {
    pub phase: ReviewPhase,
    pub done: usize,
    pub total: usize,
}

/// Summary of a finished review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewOutcome {
    /// Black winrate after every analyzed move.
    pub series: WinrateSeries,
    /// Number of main-line positions analyzed.
    pub analyzed_moves: usize,
    /// Number of positions where alternatives were explored.
    pub variations: usize,
}

/// Reviews game records with an [`Analyst`].
pub struct GameAnalyzer<A: Analyst> {
    analyst: A,
    config: AnalysisConfig,
}

/// Per-move results of the main-line pass.
struct MainLine {
    moves: Vec<NodeId>,
    results: Vec<Option<AnalysisResult>>,
    /// Positions whose game move lost enough to explore alternatives.
    queued: Vec<bool>,
}

impl<A: Analyst> GameAnalyzer<A> {
    pub fn new(analyst: A, config: AnalysisConfig) -> Self {
        Self { analyst, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyst(&self) -> &A {
        &self.analyst
    }

    pub fn into_analyst(self) -> A {
        self.analyst
    }

    /// Reviews `game` in place.
    ///
    /// `flush` is called with the annotated record after every analyzed move
    /// and every explored position, and once more with the partial record
    /// when the review fails. `progress` is called after every completed
    /// analysis task.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidGame`] when one color moves twice in
    /// a row, and propagates engine, cache and `flush` errors.
    pub fn review<F, P>(
        &mut self,
        game: &mut GameTree,
        settings: &GameSettings,
        include_variations: bool,
        mut flush: F,
        mut progress: P,
    ) -> Result<ReviewOutcome, AnalysisError>
    where
        F: FnMut(&GameTree) -> Result<(), AnalysisError>,
        P: FnMut(ReviewProgress),
    {
        let result = self.run(game, settings, include_variations, &mut flush, &mut progress);
        if let Err(e) = &result {
            error!("review aborted: {}", e);
            if let Err(flush_error) = flush(game) {
                error!("cannot save the partial record: {}", flush_error);
            }
        }
        result
    }

    fn run<F, P>(
        &mut self,
        game: &mut GameTree,
        settings: &GameSettings,
        include_variations: bool,
        flush: &mut F,
        progress: &mut P,
    ) -> Result<ReviewOutcome, AnalysisError>
    where
        F: FnMut(&GameTree) -> Result<(), AnalysisError>,
        P: FnMut(ReviewProgress),
    {
        let moves: Vec<NodeId> = game.main_line().into_iter().skip(1).collect();
        if self.config.wipe_comments {
            for &id in &moves {
                game.node_mut(id).remove("C");
            }
        }

        let mut outcome = ReviewOutcome::default();
        let main_line = self.analyze_main_line(game, moves, settings, &mut outcome, flush, progress)?;

        if include_variations {
            outcome.variations = self.analyze_variations(game, &main_line, settings, flush, progress)?;
        }
        Ok(outcome)
    }

    fn analyze_main_line<F, P>(
        &mut self,
        game: &mut GameTree,
        moves: Vec<NodeId>,
        settings: &GameSettings,
        outcome: &mut ReviewOutcome,
        flush: &mut F,
        progress: &mut P,
    ) -> Result<MainLine, AnalysisError>
    where
        F: FnMut(&GameTree) -> Result<(), AnalysisError>,
        P: FnMut(ReviewProgress),
    {
        let board_size = settings.board_size;
        let in_range: Vec<bool> = (1..=moves.len()).map(|n| self.config.in_range(n)).collect();
        let total = in_range.iter().filter(|&&analyze| analyze).count();
        info!("analyzing main line: {} moves", total);

        self.analyst.clear_moves();
        self.analyst.set_search_time(self.config.analyze_time);
        replay(&mut self.analyst, game.node(game.root()))?;

        let mut line = MainLine {
            results: vec![None; moves.len()],
            queued: vec![false; moves.len()],
            moves,
        };
        let mut prev_best: Option<Candidate> = None;
        let mut has_prev = false;
        let mut previous_mover: Option<Color> = None;

        for index in 0..line.moves.len() {
            let id = line.moves[index];
            let played = replay(&mut self.analyst, game.node(id))?;

            if let Some((color, _)) = &played {
                if previous_mover == Some(*color) {
                    return Err(AnalysisError::InvalidGame(format!(
                        "two consecutive {} moves at move {}",
                        color,
                        index + 1
                    )));
                }
                previous_mover = Some(*color);
            }

            if !in_range[index] {
                has_prev = false;
                prev_best = None;
                continue;
            }

            let result = self.analyst.analyze()?;
            let this_move = played.as_ref().map(|(_, pos)| pos.as_str());

            let mut delta = 0.0;
            if let (Some(winrate), Some(best), Some(this_move)) =
                (result.stats.winrate, prev_best.as_ref(), this_move)
            {
                if this_move != best.pos {
                    let change = winrate - best.winrate;
                    delta = f64::min(
                        0.0,
                        if self.analyst.to_move() == Color::Black {
                            -change
                        } else {
                            change
                        },
                    );
                }
                if -delta > self.config.analyze_threshold {
                    format_delta_info(delta, this_move, board_size).apply(game.node_mut(id));
                }
            }

            if has_prev && delta <= -self.config.variations_threshold {
                line.queued[index - 1] = true;
            }

            if -delta > self.config.analyze_threshold {
                if let Some((color, pos)) = &played {
                    warn!(
                        "move {}: {} {} is a mistake (winrate dropped by {:.2}%)",
                        index + 1,
                        color,
                        convert_coordinate(pos, board_size).unwrap_or_else(|_| pos.clone()),
                        -delta * 100.0
                    );
                }
            }

            let next_move = next_game_move(game, &line.moves, index);
            format_winrate(&result, next_move.as_deref(), board_size).apply(game.node_mut(id));

            if has_prev && (-delta > self.config.analyze_threshold || line.queued[index - 1]) {
                if let Some(prev) = &line.results[index - 1] {
                    let candidates = filter_candidates(&prev.candidates, self.config.move_list_threshold);
                    format_analysis(&prev.stats, &candidates, this_move, board_size)
                        .apply(game.node_mut(line.moves[index - 1]));
                }
            }

            if let Some(winrate) = result.stats.winrate {
                outcome.series.push(index + 1, winrate);
            }
            prev_best = if result.is_book() {
                None
            } else {
                result.best_candidate().cloned()
            };
            line.results[index] = Some(result);
            has_prev = true;

            flush(game)?;
            outcome.analyzed_moves += 1;
            progress(ReviewProgress {
                phase: ReviewPhase::MainLine,
                done: outcome.analyzed_moves,
                total,
            });
            info!("analysis done for {}/{} moves", outcome.analyzed_moves, total);

            if let Some(winrate) = line.results[index].as_ref().and_then(|r| r.stats.winrate) {
                if self.config.is_decided(winrate) {
                    info!(
                        "black winrate {:.2}% decides the game, stopping at move {}",
                        winrate * 100.0,
                        index + 1
                    );
                    break;
                }
            }
        }

        info!("finished analyzing main line");
        Ok(line)
    }

    fn analyze_variations<F, P>(
        &mut self,
        game: &mut GameTree,
        line: &MainLine,
        settings: &GameSettings,
        flush: &mut F,
        progress: &mut P,
    ) -> Result<usize, AnalysisError>
    where
        F: FnMut(&GameTree) -> Result<(), AnalysisError>,
        P: FnMut(ReviewProgress),
    {
        let total = line.queued.iter().filter(|&&queued| queued).count();
        if total == 0 {
            return Ok(0);
        }
        info!(
            "exploring variations for {} moves with a budget of {} searches",
            total, self.config.variations_budget
        );

        let variation_settings = self.config.variation_settings();
        self.analyst.clear_moves();
        self.analyst.set_search_time(self.config.variations_time);
        replay(&mut self.analyst, game.node(game.root()))?;

        let mut done = 0;
        let mut explored = 0;
        for (index, &id) in line.moves.iter().enumerate() {
            replay(&mut self.analyst, game.node(id))?;

            if !line.queued[index] {
                continue;
            }
            let Some(result) = &line.results[index] else {
                continue;
            };

            let game_move = next_game_move(game, &line.moves, index);
            let tree = VariationTree::explore(
                &mut self.analyst,
                result,
                game_move.as_deref(),
                &variation_settings,
            )?;
            if let Some(tree) = tree {
                tree.record(game, id, settings.board_size, variation_settings.num_to_show);
                flush(game)?;
                explored += 1;
            }

            done += 1;
            progress(ReviewProgress {
                phase: ReviewPhase::Variations,
                done,
                total,
            });
            info!("analyzed {}/{} mistakes", done, total);
        }

        info!("finished exploring variations");
        Ok(explored)
    }
}

/// The move played after main-line position `index`, as an SGF point code.
fn next_game_move(game: &GameTree, moves: &[NodeId], index: usize) -> Option<String> {
    moves
        .get(index + 1)
        .and_then(|&next| game.node(next).game_move())
        .map(|(_, pos)| pos.to_string())
}

/// Feeds a node's moves and setup stones to the analyst in the order
/// `W`, `B`, `AB`, `AW`. Returns the move played in the node.
fn replay<A: Analyst>(analyst: &mut A, node: &Node) -> Result<Option<(Color, String)>, AnalysisError> {
    let mut played = None;
    for (color, ident) in [(Color::White, "W"), (Color::Black, "B")] {
        if let Some(pos) = node.get(ident) {
            analyst.push_move(color, pos)?;
            played = Some((color, pos.to_string()));
        }
    }
    for (color, ident) in [(Color::Black, "AB"), (Color::White, "AW")] {
        for value in node.values(ident) {
            for pos in setup_points(value) {
                analyst.push_move(color, &pos)?;
            }
        }
    }
    Ok(played)
}

/// Expands a compressed `aa:cc` rectangle of setup points.
fn setup_points(value: &str) -> Vec<String> {
    let Some((from, to)) = value.split_once(':') else {
        return vec![value.to_string()];
    };
    let (from, to) = (from.as_bytes(), to.as_bytes());
    if from.len() != 2 || to.len() != 2 {
        return vec![value.to_string()];
    }

    let mut points = Vec::new();
    for col in from[0].min(to[0])..=from[0].max(to[0]) {
        for row in from[1].min(to[1])..=from[1].max(to[1]) {
            points.push(format!("{}{}", col as char, row as char));
        }
    }
    points
}
