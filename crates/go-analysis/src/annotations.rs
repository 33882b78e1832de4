//! Review text, labels and markers written into game record nodes.

use go_core::{convert_coordinate, Move};
use gtp::{AnalysisResult, AnalysisStats, Candidate};
use sgf::Node;

const CANDIDATE_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DELTA_RULE: &str = "=================================\n";
const ANALYSIS_RULE: &str = "==========================\n";

/// Severity bands for a winrate drop, most severe first.
const BIG_MISTAKE: f64 = -0.2;
const MISTAKE: f64 = -0.1;
const NOT_BEST: f64 = -0.05;
const SLIGHTLY_DISLIKED: f64 = -0.025;

/// Text plus board markup to add to one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub comment: String,
    /// `(point, label)` pairs for `LB`.
    pub labels: Vec<(String, String)>,
    /// Points for `TR`.
    pub triangles: Vec<String>,
}

impl Annotation {
    fn comment(comment: String) -> Self {
        Self {
            comment,
            ..Self::default()
        }
    }

    /// Appends the comment and adds the markup to `node`.
    pub fn apply(&self, node: &mut Node) {
        node.append_comment(&self.comment);
        for (pos, label) in &self.labels {
            node.add_label(pos, label);
        }
        for pos in &self.triangles {
            node.add_triangle(pos);
        }
    }
}

fn vertex(pos: &str, board_size: u8) -> String {
    convert_coordinate(pos, board_size).unwrap_or_else(|_| pos.to_string())
}

fn is_pass(pos: &str, board_size: u8) -> bool {
    Move::from_sgf(pos, board_size).is_ok_and(Move::is_pass)
}

/// Overall Black winrate of a position, plus the engine's preferred move
/// when it differs from the move played next.
pub fn format_winrate(result: &AnalysisResult, next_game_move: Option<&str>, board_size: u8) -> Annotation {
    let mut comment = String::new();
    match result.stats.winrate {
        Some(winrate) => {
            comment.push_str(&format!("Overall black win%: {:.2}%\n", winrate * 100.0));
        }
        None => comment.push_str("Overall black win%: not computed (still in opening book)\n"),
    }

    match result.candidates.first() {
        Some(best) if Some(best.pos.as_str()) != next_game_move => {
            comment.push_str(&format!("Preferred next move: {}\n", vertex(&best.pos, board_size)));
        }
        _ => comment.push('\n'),
    }

    Annotation::comment(comment)
}

/// Describes a winrate drop caused by `this_move`. `delta` is zero or negative.
pub fn format_delta_info(delta: f64, this_move: &str, board_size: u8) -> Annotation {
    let mut annotation = Annotation::default();
    let comment = &mut annotation.comment;
    let shown = vertex(this_move, board_size);

    let verdict = if delta <= BIG_MISTAKE {
        Some(format!("{} is a big mistake!\nWinning percentage drops by {:.2}%!", shown, -delta * 100.0))
    } else if delta <= MISTAKE {
        Some(format!("{} is a mistake!\nWinning percentage drops by {:.2}%", shown, -delta * 100.0))
    } else if delta <= NOT_BEST {
        Some(format!("{} is not the best choice.\nWinning percentage drops by {:.2}%", shown, -delta * 100.0))
    } else {
        None
    };

    if let Some(verdict) = verdict {
        comment.push_str(DELTA_RULE);
        comment.push_str(&format!("The engine thinks {}\n", verdict));
        comment.push_str(DELTA_RULE);
        if !is_pass(this_move, board_size) {
            annotation.labels.push((this_move.to_string(), "?".to_string()));
        }
    } else if delta <= SLIGHTLY_DISLIKED {
        comment.push_str(DELTA_RULE);
        comment.push_str(&format!("The engine slightly dislikes {}.\n", shown));
        comment.push_str(DELTA_RULE);
    }

    annotation.comment.push('\n');
    annotation
}

/// Lists the candidate moves of a position with the mover's winrate,
/// labelling them `A`, `B`, ... on the board. `this_move`, the move actually
/// played, gets a triangle when the engine did not consider it.
pub fn format_analysis(
    stats: &AnalysisStats,
    candidates: &[Candidate],
    this_move: Option<&str>,
    board_size: u8,
) -> Annotation {
    let mut annotation = Annotation::default();
    let comment = &mut annotation.comment;
    comment.push_str(ANALYSIS_RULE);

    match (stats.book_moves, stats.book_positions) {
        (Some(moves), positions) => {
            comment.push_str(&format!("Considered {}/{} bookmoves\n", moves, positions.unwrap_or(0)));
        }
        (None, _) => {
            comment.push_str(&format!("Visited {} nodes\n", stats.visits.unwrap_or(0)));
            comment.push('\n');
            for (letter, candidate) in CANDIDATE_LETTERS.chars().zip(candidates) {
                let winrate = candidate
                    .color
                    .map_or(candidate.winrate, |c| c.winrate_for(candidate.winrate));
                comment.push_str(&format!(
                    "{} -> Win%: {:.2}% ({} visits) \n",
                    letter,
                    winrate * 100.0,
                    candidate.visits
                ));
            }
        }
    }

    annotation.labels = CANDIDATE_LETTERS
        .chars()
        .zip(candidates)
        .filter(|(_, c)| !c.pos.is_empty() && c.pos != "tt")
        .map(|(letter, c)| (c.pos.clone(), letter.to_string()))
        .collect();

    if let Some(played) = this_move {
        let considered = candidates.iter().any(|c| c.pos == played);
        if !considered && !is_pass(played, board_size) {
            annotation.triangles.push(played.to_string());
        }
    }

    annotation
}
