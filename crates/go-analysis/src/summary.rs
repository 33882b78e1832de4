//! Winrate graph data for a reviewed game.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Black's winrate after one move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinratePoint {
    /// 1-based main-line move number.
    pub move_number: usize,
    pub black_winrate: f64,
}

/// Black winrate over the course of a game, in move order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinrateSeries {
    pub points: Vec<WinratePoint>,
}

impl WinrateSeries {
    pub fn push(&mut self, move_number: usize, black_winrate: f64) {
        self.points.push(WinratePoint {
            move_number,
            black_winrate,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Largest swing between consecutive points, as `(move_number, change)`.
    /// The change is signed from Black's view.
    pub fn largest_swing(&self) -> Option<(usize, f64)> {
        self.points
            .windows(2)
            .map(|pair| (pair[1].move_number, pair[1].black_winrate - pair[0].black_winrate))
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the series as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_json()?)
    }
}
