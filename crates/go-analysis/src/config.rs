//! Review settings, usually read from the `[analysis]` table of `review.toml`.

use crate::retry::RetryPolicy;
use crate::variations::VariationSettings;
use serde::{Deserialize, Serialize};

/// Configuration for a game review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Seconds per main-line search. Defaults to 10.
    #[serde(default = "default_analyze_time")]
    pub analyze_time: u64,
    /// Seconds per variation search. Defaults to 15.
    #[serde(default = "default_variations_time")]
    pub variations_time: u64,
    /// Winrate drop that gets a move annotated. Defaults to 0.05.
    #[serde(default = "default_analyze_threshold")]
    pub analyze_threshold: f64,
    /// Winrate drop that gets alternatives explored. Defaults to 0.1.
    #[serde(default = "default_variations_threshold")]
    pub variations_threshold: f64,
    /// Engine searches spent per explored mistake. Defaults to 8.
    #[serde(default = "default_variations_budget")]
    pub variations_budget: usize,
    /// Plies of an unexplored principal variation to preview, 0 for all.
    /// Defaults to 10.
    #[serde(default = "default_num_to_show")]
    pub num_to_show: usize,
    /// First move number to analyze (1-based). Defaults to 1.
    #[serde(default = "default_move_from")]
    pub move_from: usize,
    /// Last move number to analyze. Defaults to 1000.
    #[serde(default = "default_move_till")]
    pub move_till: usize,
    /// Remove existing comments before annotating.
    #[serde(default)]
    pub wipe_comments: bool,
    /// Candidates with a visit share at or below this are ignored.
    /// Defaults to 0.05.
    #[serde(default = "default_move_list_threshold")]
    pub move_list_threshold: f64,
    /// Attempts per engine search before giving up on the game. Defaults to 3.
    #[serde(default = "default_restarts")]
    pub restarts: u32,
    /// Ignore cached results and search every position again.
    #[serde(default)]
    pub skip_cached: bool,
    /// Stop the main line once Black's winrate is above this bound or below
    /// its complement. Unset by default.
    #[serde(default)]
    pub stop_on_winrate: Option<f64>,
}

fn default_analyze_time() -> u64 {
    10
}

fn default_variations_time() -> u64 {
    15
}

fn default_analyze_threshold() -> f64 {
    0.05
}

fn default_variations_threshold() -> f64 {
    0.1
}

fn default_variations_budget() -> usize {
    8
}

fn default_num_to_show() -> usize {
    10
}

fn default_move_from() -> usize {
    1
}

fn default_move_till() -> usize {
    1000
}

fn default_move_list_threshold() -> f64 {
    0.05
}

fn default_restarts() -> u32 {
    3
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analyze_time: default_analyze_time(),
            variations_time: default_variations_time(),
            analyze_threshold: default_analyze_threshold(),
            variations_threshold: default_variations_threshold(),
            variations_budget: default_variations_budget(),
            num_to_show: default_num_to_show(),
            move_from: default_move_from(),
            move_till: default_move_till(),
            wipe_comments: false,
            move_list_threshold: default_move_list_threshold(),
            restarts: default_restarts(),
            skip_cached: false,
            stop_on_winrate: None,
        }
    }
}

impl AnalysisConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.restarts)
    }

    pub fn variation_settings(&self) -> VariationSettings {
        VariationSettings {
            budget: self.variations_budget,
            num_to_show: self.num_to_show,
            move_list_threshold: self.move_list_threshold,
        }
    }

    /// Whether a black winrate is decided enough to end the main line.
    pub fn is_decided(&self, black_winrate: f64) -> bool {
        self.stop_on_winrate
            .is_some_and(|bound| black_winrate > bound || black_winrate < 1.0 - bound)
    }

    /// Whether the 1-based move number falls in `[move_from, move_till]`.
    pub fn in_range(&self, move_number: usize) -> bool {
        (self.move_from..=self.move_till).contains(&move_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.analyze_time, 10);
        assert_eq!(config.variations_time, 15);
        assert_eq!(config.variations_budget, 8);
        assert!(!config.wipe_comments);
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.stop_on_winrate, None);
    }

    #[test]
    fn test_is_decided() {
        assert!(!AnalysisConfig::default().is_decided(0.99));

        let config = AnalysisConfig {
            stop_on_winrate: Some(0.9),
            ..AnalysisConfig::default()
        };
        assert!(config.is_decided(0.95));
        assert!(config.is_decided(0.05));
        assert!(!config.is_decided(0.9));
        assert!(!config.is_decided(0.5));
    }

    #[test]
    fn test_in_range() {
        let config = AnalysisConfig {
            move_from: 5,
            move_till: 10,
            ..AnalysisConfig::default()
        };
        assert!(!config.in_range(4));
        assert!(config.in_range(5));
        assert!(config.in_range(10));
        assert!(!config.in_range(11));
    }

    #[test]
    fn test_variation_settings() {
        let config = AnalysisConfig {
            variations_budget: 3,
            num_to_show: 4,
            move_list_threshold: 0.1,
            ..AnalysisConfig::default()
        };
        let settings = config.variation_settings();
        assert_eq!(settings.budget, 3);
        assert_eq!(settings.num_to_show, 4);
        assert_eq!(settings.move_list_threshold, 0.1);
    }
}
