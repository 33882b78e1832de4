//! Best-first exploration of alternative lines.
//!
//! Starting from a position that has already been analyzed, every candidate
//! move except the one played in the game becomes a leaf carrying the
//! probability of being reached. The leaf with the largest cumulative
//! probability is analyzed and expanded next, until the budget of engine
//! searches is spent. The resulting tree is then written into the game
//! record as variations.

use crate::annotations::{format_analysis, format_winrate};
use crate::cache::{AnalysisCache, CacheKey};
use crate::retry::RetryPolicy;
use crate::AnalysisError;
use go_core::Color;
use gtp::{AnalysisResult, Candidate, EngineSession};
use sgf::GameTree;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

/// Something that can analyze positions described by a move history.
pub trait Analyst {
    /// Color to move after the current history.
    fn to_move(&self) -> Color;

    /// Appends a move given as an SGF point code.
    fn push_move(&mut self, color: Color, pos: &str) -> Result<(), AnalysisError>;

    /// Removes the last `count` moves.
    fn pop_moves(&mut self, count: usize);

    /// Removes every move.
    fn clear_moves(&mut self);

    /// Sets the search time used by subsequent analyses.
    fn set_search_time(&mut self, seconds: u64);

    /// Analyzes the position after the current history.
    fn analyze(&mut self) -> Result<AnalysisResult, AnalysisError>;
}

/// [`Analyst`] backed by an engine session, with results cached on disk and
/// searches retried after restarting the engine.
pub struct SessionAnalyst<'a> {
    session: &'a mut EngineSession,
    cache: &'a AnalysisCache,
    retry: RetryPolicy,
    cache_hits: usize,
}

impl<'a> SessionAnalyst<'a> {
    pub fn new(session: &'a mut EngineSession, cache: &'a AnalysisCache, retry: RetryPolicy) -> Self {
        Self {
            session,
            cache,
            retry,
            cache_hits: 0,
        }
    }

    /// Number of analyses answered from the cache so far.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }
}

impl Analyst for SessionAnalyst<'_> {
    fn to_move(&self) -> Color {
        self.session.whose_turn()
    }

    fn push_move(&mut self, color: Color, pos: &str) -> Result<(), AnalysisError> {
        self.session.add_move(color, pos)?;
        Ok(())
    }

    fn pop_moves(&mut self, count: usize) {
        self.session.pop_moves(count);
    }

    fn clear_moves(&mut self) {
        self.session.clear_history();
    }

    fn set_search_time(&mut self, seconds: u64) {
        self.session.set_seconds_per_search(seconds);
    }

    fn analyze(&mut self) -> Result<AnalysisResult, AnalysisError> {
        let key = CacheKey::new(
            self.session.history_hash(),
            self.session.seconds_per_search(),
        );
        let session = &mut *self.session;
        let retry = self.retry;

        let (result, hit) = self.cache.get(&key, || {
            retry.run(|attempt| -> Result<AnalysisResult, AnalysisError> {
                if attempt > 1 {
                    session.restart()?;
                }
                session.go_to_position()?;
                Ok(session.analyze()?)
            })
        })?;

        if hit {
            self.cache_hits += 1;
        }
        Ok(result)
    }
}

/// Limits of one variation search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationSettings {
    /// Maximum number of engine searches (node expansions).
    pub budget: usize,
    /// Plies of an unexplored principal variation to preview, 0 for all.
    pub num_to_show: usize,
    /// Candidates with a visit share at or below this are dropped.
    pub move_list_threshold: f64,
}

/// Drops candidates whose share of the total visits is at or below
/// `threshold`. Opening book lists are returned unchanged.
pub fn filter_candidates(candidates: &[Candidate], threshold: f64) -> Vec<Candidate> {
    let total: u64 = candidates.iter().map(|c| c.visits).sum();
    if total == 0 || candidates.iter().any(|c| c.is_book) {
        return candidates.to_vec();
    }
    candidates
        .iter()
        .filter(|c| c.visits as f64 / total as f64 > threshold)
        .cloned()
        .collect()
}

/// Unnormalized likelihood of each candidate being played.
fn raw_weights(candidates: &[Candidate], is_root: bool) -> Vec<f64> {
    let total: u64 = candidates.iter().map(|c| c.visits).sum();
    candidates
        .iter()
        .map(|c| {
            if c.is_book {
                1.0
            } else if is_root {
                c.visits as f64
            } else {
                let share = if total > 0 {
                    c.visits as f64 / total as f64
                } else {
                    0.0
                };
                (c.policy_prob + share) / 2.0
            }
        })
        .collect()
}

/// One position of the variation tree.
#[derive(Debug, Clone)]
pub struct VariationNode {
    /// Moves leading here from the root position, as SGF point codes.
    pub history: Vec<String>,
    /// Color to move in this position.
    pub color: Color,
    pub is_root: bool,
    pub explored: bool,
    /// Probability among siblings.
    pub probability: f64,
    /// Product of probabilities from the root.
    pub cumulative: f64,
    /// Analysis of this position, with filtered candidates. Empty until explored.
    pub result: AnalysisResult,
    /// One entry per candidate of `result`; `None` for the game move at the root.
    pub children: Vec<Option<usize>>,
}

#[derive(Debug)]
struct Leaf {
    mass: f64,
    id: usize,
}

impl Ord for Leaf {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mass
            .total_cmp(&other.mass)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Leaf {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Leaf {}

/// Tree of explored alternatives below one game position.
#[derive(Debug, Clone)]
pub struct VariationTree {
    nodes: Vec<VariationNode>,
    expansions: usize,
}

impl VariationTree {
    /// Explores alternatives to `game_move` from the analyzed position
    /// `root_result`, which must be the analyst's current position.
    ///
    /// Returns `None` without calling the engine when the position is in
    /// the opening book or has no candidates.
    ///
    /// # Errors
    ///
    /// Propagates the first analysis error. The analyst's history is
    /// restored before returning in every case.
    pub fn explore<A: Analyst>(
        analyst: &mut A,
        root_result: &AnalysisResult,
        game_move: Option<&str>,
        settings: &VariationSettings,
    ) -> Result<Option<Self>, AnalysisError> {
        if root_result.is_book() {
            debug!("skipping variations of a book position");
            return Ok(None);
        }
        let candidates = filter_candidates(&root_result.candidates, settings.move_list_threshold);
        if candidates.is_empty() {
            debug!("skipping variations of a position without candidates");
            return Ok(None);
        }

        let root_color = analyst.to_move();
        let mut tree = Self {
            nodes: vec![VariationNode {
                history: Vec::new(),
                color: root_color,
                is_root: true,
                explored: false,
                probability: 1.0,
                cumulative: 1.0,
                result: AnalysisResult::default(),
                children: Vec::new(),
            }],
            expansions: 0,
        };
        let mut frontier = BinaryHeap::new();
        let root = AnalysisResult {
            stats: root_result.stats.clone(),
            candidates,
        };
        tree.expand(0, root, game_move, &mut frontier);

        while tree.expansions < settings.budget {
            let Some(leaf) = frontier.pop() else {
                break;
            };
            let history = tree.nodes[leaf.id].history.clone();
            debug!(
                "exploring {} (reach probability {:.3})",
                history.join(" "),
                leaf.mass
            );

            let mut result = analyze_line(analyst, root_color, &history)?;
            result.candidates = filter_candidates(&result.candidates, settings.move_list_threshold);
            tree.expand(leaf.id, result, None, &mut frontier);
            tree.expansions += 1;
        }

        Ok(Some(tree))
    }

    pub fn root(&self) -> &VariationNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: usize) -> &VariationNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[VariationNode] {
        &self.nodes
    }

    /// Number of engine searches made below the root.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    fn expand(
        &mut self,
        id: usize,
        result: AnalysisResult,
        exclude: Option<&str>,
        frontier: &mut BinaryHeap<Leaf>,
    ) {
        let parent = &self.nodes[id];
        let is_root = parent.is_root;
        let parent_mass = parent.cumulative;
        let child_color = parent.color.opposite();
        let base_history = parent.history.clone();

        let weights = raw_weights(&result.candidates, is_root);
        let included: Vec<bool> = result
            .candidates
            .iter()
            .map(|c| !(is_root && Some(c.pos.as_str()) == exclude))
            .collect();
        let total: f64 = weights
            .iter()
            .zip(&included)
            .filter(|(_, &keep)| keep)
            .map(|(w, _)| w)
            .sum();
        let count = included.iter().filter(|&&keep| keep).count();

        let mut children = Vec::with_capacity(result.candidates.len());
        for ((candidate, weight), keep) in result.candidates.iter().zip(&weights).zip(&included) {
            if !keep {
                children.push(None);
                continue;
            }
            let probability = if total > 0.0 {
                weight / total
            } else {
                1.0 / count as f64
            };
            let mut history = base_history.clone();
            history.push(candidate.pos.clone());

            let child = self.nodes.len();
            let cumulative = parent_mass * probability;
            self.nodes.push(VariationNode {
                history,
                color: child_color,
                is_root: false,
                explored: false,
                probability,
                cumulative,
                result: AnalysisResult::default(),
                children: Vec::new(),
            });
            frontier.push(Leaf {
                mass: cumulative,
                id: child,
            });
            children.push(Some(child));
        }

        let node = &mut self.nodes[id];
        node.children = children;
        node.result = result;
        node.explored = true;
    }

    /// Writes the tree into `game` below the node `at`, which must hold the
    /// root position.
    ///
    /// Explored nodes get a winrate comment and the analysis of their
    /// first-ranked and explored replies. An unexplored first-ranked reply is
    /// previewed along its principal variation for `num_to_show` plies.
    pub fn record(&self, game: &mut GameTree, at: sgf::NodeId, board_size: u8, num_to_show: usize) {
        self.record_node(0, game, at, board_size, num_to_show);
    }

    fn record_node(
        &self,
        id: usize,
        game: &mut GameTree,
        at: sgf::NodeId,
        board_size: u8,
        num_to_show: usize,
    ) {
        let node = &self.nodes[id];

        if !node.is_root {
            format_winrate(&node.result, None, board_size).apply(game.node_mut(at));

            let shown: Vec<Candidate> = node
                .children
                .iter()
                .enumerate()
                .filter_map(|(i, child)| match child {
                    Some(c) if i == 0 || self.nodes[*c].explored => node.result.candidates.get(i).cloned(),
                    _ => None,
                })
                .collect();
            format_analysis(&node.result.stats, &shown, None, board_size).apply(game.node_mut(at));
        }

        for (i, child) in node.children.iter().enumerate() {
            let Some(child_id) = *child else {
                continue;
            };
            let child_node = &self.nodes[child_id];

            if child_node.explored {
                if let Some(pos) = child_node.history.last() {
                    let next = game.find_or_append_child(at, node.color, pos);
                    self.record_node(child_id, game, next, board_size, num_to_show);
                }
            } else if i == 0 {
                let pv = node
                    .result
                    .candidates
                    .first()
                    .map(|c| c.pv.as_slice())
                    .unwrap_or(&[]);
                let plies = if num_to_show == 0 {
                    pv.len()
                } else {
                    pv.len().min(num_to_show)
                };

                let mut cursor = at;
                let mut color = node.color;
                for pos in &pv[..plies] {
                    cursor = game.find_or_append_child(cursor, color, pos);
                    color = color.opposite();
                }
            }
        }
    }
}

/// Plays `history` from the analyst's position, analyzes, and takes the
/// moves back again even when something failed.
fn analyze_line<A: Analyst>(
    analyst: &mut A,
    first_color: Color,
    history: &[String],
) -> Result<AnalysisResult, AnalysisError> {
    let mut color = first_color;
    let mut pushed = 0;
    let mut outcome = Ok(());
    for pos in history {
        if let Err(e) = analyst.push_move(color, pos) {
            outcome = Err(e);
            break;
        }
        pushed += 1;
        color = color.opposite();
    }

    let result = outcome.and_then(|()| analyst.analyze());
    analyst.pop_moves(pushed);
    result
}
