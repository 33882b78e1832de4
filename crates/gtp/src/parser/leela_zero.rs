//! Output grammar of Leela Zero.

use super::{parse_book_move, percent, ParseContext, ParseState, ResultParser, StatField};
use crate::analysis::{Candidate, StatusUpdate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static UPDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Playouts: ([0-9]+), Win: ([0-9]+\.[0-9]+)%, PV:(( [A-Z][0-9]+)+)")
        .expect("valid regex")
});
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^NN eval=([0-9]+\.[0-9]+)").expect("valid regex"));
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*([A-Z][0-9]+) -> +([0-9]+) \(V: +([0-9]+\.[0-9]+)%\) \([^)]*\) \(N: +([0-9]+\.[0-9]+)%\) PV: (.*)",
    )
    .expect("valid regex")
});
static STATS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+) visits, ([0-9]+) nodes(?:, ([0-9]+) playouts)(?:, ([0-9]+) n/s)")
        .expect("valid regex")
});

/// Parser for Leela Zero. Its best move and winrate come from the top of
/// the candidate list rather than from a summary line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeelaZeroParser;

impl ResultParser for LeelaZeroParser {
    fn name(&self) -> &'static str {
        "leela-zero"
    }

    fn parse_status_update(&self, text: &str, ctx: &ParseContext) -> Option<StatusUpdate> {
        let caps = UPDATE_RE.captures(text)?;
        let update = StatusUpdate {
            visits: caps[1].parse().ok()?,
            winrate: ctx.flip_winrate(percent(&caps[2])?),
            pv: ctx.sequence(&caps[3]),
        };
        debug!(
            "visited {} positions, black winrate {:.2}%, PV: {}",
            update.visits,
            update.winrate * 100.0,
            caps[3].trim()
        );
        Some(update)
    }

    fn parse_line(&self, state: &mut ParseState, line: &str, ctx: &ParseContext) {
        parse_book_move(state, line);

        if let Some(caps) = STATUS_RE.captures(line) {
            let eval = caps[1].parse().ok().map(|w| ctx.flip_winrate(w));
            state.stats.nn_winrate = eval;
            state.stats.winrate = eval;
        }

        if let Some(caps) = MOVE_RE.captures(line) {
            if let Some(pos) = ctx.point(&caps[1]) {
                state.candidates.push(Candidate {
                    pos,
                    visits: caps[2].parse().unwrap_or(0),
                    winrate: percent(&caps[3]).map_or(0.0, |w| ctx.flip_winrate(w)),
                    policy_prob: percent(&caps[4]).unwrap_or(0.0),
                    pv: ctx.sequence(&caps[5]),
                    color: Some(ctx.to_move),
                    ..Candidate::default()
                });
            }
        }

        if let Some(caps) = STATS_RE.captures(line) {
            state.stats.visits = caps[1].parse().ok();
            state.summarized = true;
        }
    }

    fn complete(&self, state: &mut ParseState) {
        match state.candidates.first() {
            Some(top) => {
                state.stats.best = Some(top.pos.clone());
                state.stats.winrate = Some(top.winrate);
            }
            None => warn!("analysis has no move list"),
        }
    }

    fn required_fields(&self) -> &'static [StatField] {
        &[StatField::Best, StatField::Winrate, StatField::Visits]
    }
}
