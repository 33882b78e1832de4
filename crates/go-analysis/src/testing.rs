//! Scripted [`Analyst`] for unit tests.

use crate::variations::Analyst;
use crate::AnalysisError;
use go_core::Color;
use gtp::{AnalysisResult, AnalysisStats, Candidate};
use std::collections::HashMap;

/// Answers analyses from a table keyed by the played points. Unknown
/// positions get an empty result.
#[derive(Default)]
pub(crate) struct ScriptedAnalyst {
    pub moves: Vec<(Color, String)>,
    pub results: HashMap<Vec<String>, AnalysisResult>,
    /// Every analyzed history, in order.
    pub analyzed: Vec<Vec<(Color, String)>>,
    pub search_times: Vec<u64>,
    pub fail_at: Option<Vec<String>>,
}

impl ScriptedAnalyst {
    pub fn script(mut self, line: &[&str], result: AnalysisResult) -> Self {
        self.results
            .insert(line.iter().map(|s| s.to_string()).collect(), result);
        self
    }

    pub fn analyzed_lines(&self) -> Vec<Vec<String>> {
        self.analyzed
            .iter()
            .map(|moves| moves.iter().map(|(_, p)| p.clone()).collect())
            .collect()
    }

    fn positions(&self) -> Vec<String> {
        self.moves.iter().map(|(_, p)| p.clone()).collect()
    }
}

impl Analyst for ScriptedAnalyst {
    fn to_move(&self) -> Color {
        self.moves
            .last()
            .map_or(Color::Black, |(color, _)| color.opposite())
    }

    fn push_move(&mut self, color: Color, pos: &str) -> Result<(), AnalysisError> {
        self.moves.push((color, pos.to_string()));
        Ok(())
    }

    fn pop_moves(&mut self, count: usize) {
        let keep = self.moves.len().saturating_sub(count);
        self.moves.truncate(keep);
    }

    fn clear_moves(&mut self) {
        self.moves.clear();
    }

    fn set_search_time(&mut self, seconds: u64) {
        self.search_times.push(seconds);
    }

    fn analyze(&mut self) -> Result<AnalysisResult, AnalysisError> {
        let positions = self.positions();
        self.analyzed.push(self.moves.clone());
        if self.fail_at.as_ref() == Some(&positions) {
            return Err(AnalysisError::InvalidGame("scripted failure".to_string()));
        }
        Ok(self.results.get(&positions).cloned().unwrap_or_default())
    }
}

pub(crate) fn candidate(pos: &str, visits: u64, policy_prob: f64) -> Candidate {
    Candidate {
        pos: pos.to_string(),
        visits,
        winrate: 0.5,
        policy_prob,
        pv: vec![pos.to_string()],
        ..Candidate::default()
    }
}

/// A search result whose stats summarize `candidates`, with the given Black
/// winrate.
pub(crate) fn analysis_with_winrate(candidates: Vec<Candidate>, winrate: f64) -> AnalysisResult {
    AnalysisResult {
        stats: AnalysisStats {
            visits: Some(candidates.iter().map(|c| c.visits).sum()),
            winrate: Some(winrate),
            best: candidates.first().map(|c| c.pos.clone()),
            ..AnalysisStats::default()
        },
        candidates,
    }
}

pub(crate) fn analysis(candidates: Vec<Candidate>) -> AnalysisResult {
    analysis_with_winrate(candidates, 0.5)
}
