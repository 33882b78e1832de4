mod config;

use anyhow::Context;
use clap::Parser;
use config::{BotConfig, ReviewConfig};
use go_analysis::{
    AnalysisCache, GameAnalyzer, GameSettings, ReviewPhase, ReviewProgress, SessionAnalyst,
};
use gtp::EngineSession;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "go-review")]
#[command(about = "Annotate Go game records with a GTP engine's review")]
struct Cli {
    /// SGF files, or directories of SGF files, to review
    #[arg(required = true)]
    sgf: Vec<PathBuf>,
    /// Bot from the configuration file (defaults to `default_bot`)
    #[arg(short, long)]
    bot: Option<String>,
    /// Only annotate the main line, do not explore variations
    #[arg(long)]
    no_vars: bool,
    /// Configuration file
    #[arg(short, long, default_value_os_t = ReviewConfig::config_path())]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ReviewConfig::load(&cli.config)
        .with_context(|| format!("cannot load {}", cli.config.display()))?;
    init_logging(&config.log_level);

    let bot_name = cli.bot.clone().unwrap_or_else(|| config.default_bot.clone());
    let bot = config.get_bot(&bot_name)?;

    let games = collect_games(&cli.sgf)?;
    if games.is_empty() {
        anyhow::bail!("no SGF files found");
    }

    let mut failed = 0;
    for path in &games {
        if let Err(e) = review_file(path, &bot_name, bot, &config, !cli.no_vars) {
            error!("{:#}", e);
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} games could not be reviewed", failed, games.len());
    }
    Ok(())
}

/// Replaces each directory argument with the `.sgf` files directly inside
/// it, sorted by name. Other paths are kept as given.
fn collect_games(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut games = Vec::new();
    for path in paths {
        if !path.is_dir() {
            games.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        let entries =
            fs::read_dir(path).with_context(|| format!("cannot list {}", path.display()))?;
        for entry in entries {
            let file = entry?.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == "sgf") {
                found.push(file);
            }
        }
        found.sort();
        games.extend(found);
    }
    Ok(games)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `<stem>_<bot>.<extension>` next to the input file.
fn output_path(input: &Path, bot: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_{}.{}", stem, bot, extension))
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn report(bar: &ProgressBar, progress: ReviewProgress) {
    let phase = match progress.phase {
        ReviewPhase::MainLine => "main line",
        ReviewPhase::Variations => "variations",
    };
    bar.set_length(progress.total as u64);
    bar.set_position(progress.done as u64);
    bar.set_message(phase);
}

fn review_file(
    path: &Path,
    bot_name: &str,
    bot: &BotConfig,
    config: &ReviewConfig,
    include_variations: bool,
) -> anyhow::Result<()> {
    info!("reviewing {}", path.display());
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let mut game = sgf::parse(&text).with_context(|| format!("cannot parse {}", path.display()))?;
    let settings = GameSettings::from_root(game.node(game.root()))?;

    let mut session_config = bot.session_config();
    settings.apply(&mut session_config);
    session_config.seconds_per_search = config.analysis.analyze_time;
    let mut session = EngineSession::new(session_config);
    session
        .start()
        .with_context(|| format!("cannot start {}", bot.path.display()))?;

    let cache = AnalysisCache::for_game(&config.checkpoint_dir, bot_name, &text)?
        .with_skip_cached(config.analysis.skip_cached);
    let output = output_path(path, bot_name, "sgf");
    let bar = progress_bar();

    let result = {
        let analyst = SessionAnalyst::new(&mut session, &cache, config.analysis.retry_policy());
        let mut analyzer = GameAnalyzer::new(analyst, config.analysis.clone());
        let result = analyzer.review(
            &mut game,
            &settings,
            include_variations,
            |tree| Ok(fs::write(&output, sgf::to_sgf(tree))?),
            |progress| report(&bar, progress),
        );
        info!("{} positions answered from the cache", analyzer.analyst().cache_hits());
        result
    };
    session.stop();

    match result {
        Ok(outcome) => {
            bar.finish_with_message(format!("saved {}", output.display()));
            let series_path = output_path(path, bot_name, "json");
            outcome
                .series
                .write(&series_path)
                .with_context(|| format!("cannot write {}", series_path.display()))?;
            info!(
                "reviewed {} moves and {} mistakes of {}",
                outcome.analyzed_moves,
                outcome.variations,
                path.display()
            );
            Ok(())
        }
        Err(e) => {
            bar.abandon_with_message(format!("aborted, partial review saved to {}", output.display()));
            Err(anyhow::Error::new(e).context(format!(
                "review of {} aborted, partial record in {}",
                path.display(),
                output.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_args() {
        let cli = Cli::try_parse_from(["go-review", "game.sgf"]).unwrap();
        assert_eq!(cli.sgf, vec![PathBuf::from("game.sgf")]);
        assert_eq!(cli.bot, None);
        assert!(!cli.no_vars);
        assert_eq!(cli.config, PathBuf::from("review.toml"));
    }

    #[test]
    fn test_parse_all_args() {
        let cli = Cli::try_parse_from([
            "go-review",
            "a.sgf",
            "b.sgf",
            "-b",
            "leela",
            "--no-vars",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.sgf.len(), 2);
        assert_eq!(cli.bot.as_deref(), Some("leela"));
        assert!(cli.no_vars);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
    }

    #[test]
    fn test_sgf_is_required() {
        assert!(Cli::try_parse_from(["go-review"]).is_err());
    }

    #[test]
    fn test_collect_games_expands_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("b.sgf"), "(;B[pd])").unwrap();
        fs::write(dir.path().join("a.sgf"), "(;B[dd])").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.sgf")).unwrap();
        let single = PathBuf::from("elsewhere/game.sgf");

        let games = collect_games(&[dir.path().to_path_buf(), single.clone()]).unwrap();

        assert_eq!(
            games,
            vec![dir.path().join("a.sgf"), dir.path().join("b.sgf"), single]
        );
    }

    #[test]
    fn test_collect_games_empty_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(collect_games(&[dir.path().to_path_buf()]).unwrap().is_empty());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/games/pro.sgf"), "leela-zero", "sgf"),
            PathBuf::from("/games/pro_leela-zero.sgf")
        );
        assert_eq!(
            output_path(Path::new("pro.sgf"), "leela", "json"),
            PathBuf::from("pro_leela.json")
        );
    }
}
