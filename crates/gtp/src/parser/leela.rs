//! Output grammar of classic Leela.

use super::{parse_book_move, percent, ParseContext, ParseState, ResultParser, StatField};
use crate::analysis::{Candidate, StatusUpdate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static UPDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Nodes: ([0-9]+), Win: ([0-9]+\.[0-9]+)% \(MC:[0-9]+\.[0-9]+%/VN:[0-9]+\.[0-9]+%\), PV:(( [A-Z][0-9]+)+)",
    )
    .expect("valid regex")
});
static UPDATE_NO_VN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Nodes: ([0-9]+), Win: ([0-9]+\.[0-9]+)%, PV:(( [A-Z][0-9]+)+)")
        .expect("valid regex")
});
static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^MC winrate=([0-9]+\.[0-9]+), NN eval=([0-9]+\.[0-9]+), score=([BW]\+[0-9]+\.[0-9]+)",
    )
    .expect("valid regex")
});
static STATUS_NO_VN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^MC winrate=([0-9]+\.[0-9]+), score=([BW]\+[0-9]+\.[0-9]+)")
        .expect("valid regex")
});
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([A-Z][0-9]+) -> +([0-9]+) \(W: +(-?[0-9]+\.[0-9]+)%\) \(U: +(-?[0-9]+\.[0-9]+)%\) ",
        r"\(V: +([0-9]+\.[0-9]+)%: +([0-9]+)\) \(N: +([0-9]+\.[0-9]+)%\) PV: (.*)$",
    ))
    .expect("valid regex")
});
static MOVE_NO_VN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([A-Z][0-9]+) -> +([0-9]+) \(U: +(-?[0-9]+\.[0-9]+)%\) ",
        r"\(R: +([0-9]+\.[0-9]+)%: +([0-9]+)\) \(N: +([0-9]+\.[0-9]+)%\) PV: (.*)$",
    ))
    .expect("valid regex")
});
static BEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+) visits, score (-? ?[0-9]+\.[0-9]+)% \(from -? ?[0-9]+\.[0-9]+%\) PV: (.*)")
        .expect("valid regex")
});
static STATS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+) visits, ([0-9]+) nodes(?:, ([0-9]+) playouts)(?:, ([0-9]+) p/s)")
        .expect("valid regex")
});

const SUMMARY_SEPARATOR: &str = "================";

/// Parser for classic Leela, which reports Monte-Carlo and value network
/// winrates separately and can answer from an opening book.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeelaParser;

impl LeelaParser {
    fn parse_status(state: &mut ParseState, line: &str, ctx: &ParseContext) {
        if let Some(caps) = STATUS_RE.captures(line) {
            state.stats.mc_winrate = caps[1].parse().ok().map(|w| ctx.flip_winrate(w));
            state.stats.nn_winrate = caps[2].parse().ok().map(|w| ctx.flip_winrate(w));
            state.stats.margin = Some(caps[3].to_string());
        } else if let Some(caps) = STATUS_NO_VN_RE.captures(line) {
            state.stats.mc_winrate = caps[1].parse().ok().map(|w| ctx.flip_winrate(w));
            state.stats.margin = Some(caps[2].to_string());
        }
    }

    fn parse_move(state: &mut ParseState, line: &str, ctx: &ParseContext) {
        if let Some(caps) = MOVE_RE.captures(line) {
            let Some(pos) = ctx.point(&caps[1]) else {
                return;
            };
            let winrate = percent(&caps[3]).map(|w| ctx.flip_winrate(w));
            state.candidates.push(Candidate {
                pos,
                visits: caps[2].parse().unwrap_or(0),
                winrate: winrate.unwrap_or(0.0),
                mc_winrate: percent(&caps[4]).map(|w| ctx.flip_winrate(w)),
                nn_winrate: percent(&caps[5]).map(|w| ctx.flip_winrate(w)),
                policy_prob: percent(&caps[7]).unwrap_or(0.0),
                pv: ctx.sequence(&caps[8]),
                color: Some(ctx.to_move),
                is_book: false,
            });
        } else if let Some(caps) = MOVE_NO_VN_RE.captures(line) {
            let Some(pos) = ctx.point(&caps[1]) else {
                return;
            };
            let mc_winrate = percent(&caps[3]).map(|w| ctx.flip_winrate(w));
            state.candidates.push(Candidate {
                pos,
                visits: caps[2].parse().unwrap_or(0),
                winrate: mc_winrate.unwrap_or(0.0),
                mc_winrate,
                nn_winrate: None,
                policy_prob: percent(&caps[6]).unwrap_or(0.0),
                pv: ctx.sequence(&caps[7]),
                color: Some(ctx.to_move),
                is_book: false,
            });
        }
    }

    fn parse_summary(state: &mut ParseState, line: &str, ctx: &ParseContext) {
        if let Some(caps) = BEST_RE.captures(line) {
            if let Some(first) = caps[3].split_whitespace().next() {
                state.stats.best = ctx.point(first);
            }
            state.stats.winrate = percent(&caps[2]).map(|w| ctx.flip_winrate(w));
        }
        if let Some(caps) = STATS_RE.captures(line) {
            state.stats.visits = caps[1].parse().ok();
            state.summarized = true;
        }
    }
}

impl ResultParser for LeelaParser {
    fn name(&self) -> &'static str {
        "leela"
    }

    fn parse_status_update(&self, text: &str, ctx: &ParseContext) -> Option<StatusUpdate> {
        let caps = UPDATE_RE
            .captures(text)
            .or_else(|| UPDATE_NO_VN_RE.captures(text))?;
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
        if line.starts_with(SUMMARY_SEPARATOR) {
            state.finished = true;
        }

        parse_book_move(state, line);
        Self::parse_status(state, line, ctx);
        Self::parse_move(state, line, ctx);

        if state.finished && !state.summarized {
            Self::parse_summary(state, line, ctx);
        }
    }

    fn required_fields(&self) -> &'static [StatField] {
        &[
            StatField::Margin,
            StatField::Best,
            StatField::Winrate,
            StatField::Visits,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use go_core::Color;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn ctx(to_move: Color) -> ParseContext {
        ParseContext {
            board_size: 19,
            to_move,
        }
    }

    const SEARCH_OUTPUT: &str = "\
Thinking at most 10.0 seconds...
Nodes: 1200, Win: 48.50% (MC:47.00%/VN:50.00%), PV: D4 Q16 D16
MC winrate=0.4700, NN eval=0.5000, score=W+2.5
 D4 ->     800 (W: 51.20%) (U: 47.00%) (V: 50.00%:    800) (N: 30.1%) PV: D4 Q16 D16
Q16 ->     300 (W: 49.00%) (U: 46.00%) (V: 49.50%:    300) (N: 20.0%) PV: Q16 D4
================
1100 visits, score 51.20% (from 49.00%) PV: D4 Q16 D16
1100 visits, 2300 nodes, 1100 playouts, 350 p/s
";

    #[test]
    fn test_parse_full_search_for_black() {
        let result = LeelaParser.parse(
            &lines("= D4"),
            &lines(SEARCH_OUTPUT),
            &ctx(Color::Black),
        );

        assert_eq!(result.stats.best.as_deref(), Some("dp"));
        assert_eq!(result.stats.chosen.as_deref(), Some("dp"));
        assert_eq!(result.stats.visits, Some(1100));
        assert_eq!(result.stats.margin.as_deref(), Some("W+2.5"));
        assert!((result.stats.winrate.unwrap() - 0.512).abs() < 1e-9);
        assert!((result.stats.nn_winrate.unwrap() - 0.5).abs() < 1e-9);

        assert_eq!(result.candidates.len(), 2);
        let first = &result.candidates[0];
        assert_eq!(first.pos, "dp");
        assert_eq!(first.visits, 800);
        assert!((first.policy_prob - 0.301).abs() < 1e-9);
        assert_eq!(first.pv, vec!["dp", "pd", "dd"]);
        assert_eq!(first.color, Some(Color::Black));
    }

    #[test]
    fn test_winrates_flip_when_white_to_move() {
        let result = LeelaParser.parse(
            &lines("= D4"),
            &lines(SEARCH_OUTPUT),
            &ctx(Color::White),
        );

        assert!((result.stats.winrate.unwrap() - 0.488).abs() < 1e-9);
        assert!((result.candidates[1].winrate - 0.51).abs() < 1e-9);
        assert_eq!(result.candidates[0].color, Some(Color::White));
    }

    #[test]
    fn test_move_lines_without_value_network() {
        let output = "\
 D4 ->     500 (U: 52.00%) (R: 40.00%:   1200) (N: 12.5%) PV: D4 Q16
================
500 visits, score 52.00% (from 50.00%) PV: D4 Q16
500 visits, 900 nodes, 500 playouts, 200 p/s
";
        let result = LeelaParser.parse(&lines("= D4"), &lines(output), &ctx(Color::Black));

        let candidate = &result.candidates[0];
        assert!((candidate.winrate - 0.52).abs() < 1e-9);
        assert_eq!(candidate.mc_winrate, Some(candidate.winrate));
        assert_eq!(candidate.nn_winrate, None);
        assert!((candidate.policy_prob - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_summary_lines_before_separator_are_ignored() {
        let output = "\
100 visits, score 90.00% (from 50.00%) PV: K10
100 visits, 200 nodes, 100 playouts, 50 p/s
";
        let result = LeelaParser.parse(&lines("= K10"), &lines(output), &ctx(Color::Black));

        assert_eq!(result.stats.best, None);
        assert_eq!(result.stats.visits, None);
    }

    #[test]
    fn test_book_move_produces_book_candidate() {
        let output = "3 book moves, 45000 total positions\n";
        let result = LeelaParser.parse(&lines("= Q16"), &lines(output), &ctx(Color::Black));

        assert!(result.is_book());
        assert_eq!(result.stats.book_positions, Some(45000));
        assert_eq!(result.candidates.len(), 1);
        assert!(result.candidates[0].is_book);
        assert_eq!(result.candidates[0].pos, "pd");
    }

    #[test]
    fn test_resignation_replaced_by_best_move() {
        let result = LeelaParser.parse(
            &lines("= resign"),
            &lines(SEARCH_OUTPUT),
            &ctx(Color::Black),
        );
        assert_eq!(result.stats.chosen.as_deref(), Some("dp"));
    }

    #[test]
    fn test_status_update() {
        let update = LeelaParser
            .parse_status_update(
                "Nodes: 1200, Win: 48.50% (MC:47.00%/VN:50.00%), PV: D4 Q16",
                &ctx(Color::White),
            )
            .unwrap();
        assert_eq!(update.visits, 1200);
        assert!((update.winrate - 0.515).abs() < 1e-9);
        assert_eq!(update.pv, vec!["dp", "pd"]);

        assert!(LeelaParser
            .parse_status_update("Nodes: 10, Win: 50.00%, PV: D4", &ctx(Color::Black))
            .is_some());
        assert!(LeelaParser
            .parse_status_update("Thinking at most 10.0 seconds...", &ctx(Color::Black))
            .is_none());
    }
}
