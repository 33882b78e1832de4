//! Engine process lifecycle and GTP command sequencing.
//!
//! An [`EngineSession`] owns one engine child process, a reader thread for
//! each of its output streams and the command history describing the
//! current position. Commands are strictly sequential: each one is written,
//! then stdout is polled until the expected number of `=` acknowledgments
//! arrive or the poll budget runs out.
//!
//! # Example
//!
//! ```no_run
//! use go_core::Color;
//! use gtp::{EngineKind, EngineSession, SessionConfig};
//!
//! let mut session = EngineSession::new(SessionConfig::new("leelaz", EngineKind::LeelaZero));
//! session.start()?;
//! session.add_move(Color::Black, "pd")?;
//! session.go_to_position()?;
//! let result = session.analyze()?;
//! println!("best move: {:?}", result.stats.best);
//! # Ok::<(), gtp::GtpError>(())
//! ```

use crate::analysis::AnalysisResult;
use crate::parser::{EngineKind, ParseContext, ResultParser};
use crate::reader::PipeReader;
use crate::GtpError;
use go_core::{convert_coordinate, Color, CoordinateError};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extra polls allowed for every command on top of the search time.
pub const DEFAULT_PROTOCOL_TIMEOUT: u64 = 200;

/// Launch and timing settings for one engine session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    pub kind: EngineKind,
    pub board_size: u8,
    pub komi: f64,
    /// Number of handicap stones. A handicapped game starts with White to move.
    pub handicap: u32,
    pub seconds_per_search: u64,
    /// Polls added to `seconds_per_search * 10` before a command times out.
    pub protocol_timeout: u64,
    pub poll_interval: Duration,
    /// Wait between spawning the engine and sending the first command.
    pub settle_delay: Duration,
    /// Wait between `quit` and killing the process.
    pub shutdown_grace: Duration,
}

impl SessionConfig {
    pub fn new(executable: impl Into<PathBuf>, kind: EngineKind) -> Self {
        Self {
            executable: executable.into(),
            arguments: EngineKind::default_arguments(),
            kind,
            board_size: 19,
            komi: 6.5,
            handicap: 0,
            seconds_per_search: 10,
            protocol_timeout: DEFAULT_PROTOCOL_TIMEOUT,
            poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_secs(2),
            shutdown_grace: Duration::from_millis(100),
        }
    }
}

/// Lifecycle state of an [`EngineSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Ready,
    Analyzing,
    Stopping,
}

/// One `play` command of the position history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub color: Color,
    /// Engine vertex, or `pass`.
    pub vertex: String,
}

impl HistoryEntry {
    /// The GTP command replaying this move.
    pub fn command(&self) -> String {
        format!("play {} {}", self.color.gtp_name(), self.vertex)
    }
}

/// Raw output of one `genmove` search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

struct RunningEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: PipeReader,
    stderr: PipeReader,
}

impl RunningEngine {
    fn write_line(&mut self, text: &str) -> Result<(), GtpError> {
        debug!(">> {}", text);
        writeln!(self.stdin, "{}", text)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn drain(&self) -> (Vec<String>, Vec<String>) {
        (self.stdout.drain_all(), self.stderr.drain_all())
    }

    fn ensure_alive(&mut self) -> Result<(), GtpError> {
        match self.child.try_wait()? {
            Some(status) => Err(GtpError::EngineCrash(status.to_string())),
            None => Ok(()),
        }
    }
}

/// A running (or stopped) GTP engine together with the move history that
/// defines the position it analyzes.
pub struct EngineSession {
    config: SessionConfig,
    parser: Box<dyn ResultParser>,
    history: Vec<HistoryEntry>,
    state: SessionState,
    process: Option<RunningEngine>,
}

impl EngineSession {
    /// Creates a stopped session. Call [`start`](Self::start) to launch the engine.
    pub fn new(config: SessionConfig) -> Self {
        let parser = config.kind.parser();
        Self {
            config,
            parser,
            history: Vec::new(),
            state: SessionState::Stopped,
            process: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn board_size(&self) -> u8 {
        self.config.board_size
    }

    pub fn seconds_per_search(&self) -> u64 {
        self.config.seconds_per_search
    }

    /// Changes the search budget used by subsequent `time_left`/`genmove`
    /// calls and by the command poll limit.
    pub fn set_seconds_per_search(&mut self, seconds: u64) {
        self.config.seconds_per_search = seconds;
    }

    /// Launches the engine and configures board size, komi and time settings.
    ///
    /// Does nothing if the engine is already running.
    ///
    /// # Errors
    ///
    /// Returns [`GtpError::Process`] if the executable cannot be spawned, or
    /// any error from the setup commands.
    pub fn start(&mut self) -> Result<(), GtpError> {
        if self.process.is_some() {
            return Ok(());
        }
        info!(engine = %self.config.executable.display(), "starting GTP engine");
        self.state = SessionState::Starting;

        let spawned = Command::new(&self.config.executable)
            .args(&self.config.arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                self.state = SessionState::Stopped;
                return Err(e.into());
            }
        };

        thread::sleep(self.config.settle_delay);

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            self.state = SessionState::Stopped;
            return Err(GtpError::NotRunning);
        };
        let stdout = PipeReader::spawn("stdout", stdout)?;
        let stderr = PipeReader::spawn("stderr", stderr)?;

        self.process = Some(RunningEngine {
            child,
            stdin,
            stdout,
            stderr,
        });

        if let Err(e) = self.configure() {
            warn!("engine setup failed: {}", e);
            self.stop();
            return Err(e);
        }

        self.state = SessionState::Ready;
        info!("GTP engine started");
        Ok(())
    }

    fn configure(&mut self) -> Result<(), GtpError> {
        self.send_command(&format!("boardsize {}", self.config.board_size), 1, true)?;
        self.send_command(&format!("komi {}", self.config.komi), 1, true)?;
        self.send_command(
            &format!("time_settings 0 {} 1", self.config.seconds_per_search),
            1,
            true,
        )
    }

    /// Writes `text` and waits for `expected_acks` lines containing `=`.
    ///
    /// `text` may hold several newline-separated commands, in which case
    /// `expected_acks` should match their number. With `drain`, output left
    /// over once the acknowledgments arrived is discarded.
    ///
    /// # Errors
    ///
    /// - [`GtpError::NotRunning`] if the engine has not been started
    /// - [`GtpError::EngineCrash`] if the process exits while we wait
    /// - [`GtpError::ProtocolTimeout`] if too few acknowledgments arrive
    pub fn send_command(
        &mut self,
        text: &str,
        expected_acks: usize,
        drain: bool,
    ) -> Result<(), GtpError> {
        let tries = self.config.seconds_per_search * 10 + self.config.protocol_timeout;
        let poll_interval = self.config.poll_interval;
        let running = self.process.as_mut().ok_or(GtpError::NotRunning)?;

        running.write_line(text)?;
        if expected_acks == 0 {
            return Ok(());
        }

        let mut acks = 0;
        for _ in 0..=tries {
            loop {
                let line = running.stdout.read_line();
                if line.is_empty() {
                    break;
                }
                if line.contains('=') {
                    acks += 1;
                    if acks >= expected_acks {
                        if drain {
                            running.drain();
                        }
                        return Ok(());
                    }
                }
            }
            running.ensure_alive()?;
            thread::sleep(poll_interval);
        }

        warn!("failed to send command: {}", text);
        Err(GtpError::ProtocolTimeout {
            command: text.to_string(),
            tries,
        })
    }

    /// Appends a move given as an SGF point code (empty or `tt` for a pass).
    pub fn add_move(&mut self, color: Color, pos: &str) -> Result<(), CoordinateError> {
        let vertex = convert_coordinate(pos, self.config.board_size)?;
        self.history.push(HistoryEntry { color, vertex });
        Ok(())
    }

    /// Removes the last `count` moves from the history.
    pub fn pop_moves(&mut self, count: usize) {
        if count > self.history.len() {
            warn!(
                "asked to pop {} moves from a history of {}",
                count,
                self.history.len()
            );
        }
        let keep = self.history.len().saturating_sub(count);
        self.history.truncate(keep);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Color to move after the current history.
    pub fn whose_turn(&self) -> Color {
        match self.history.last() {
            None if self.config.handicap > 0 => Color::White,
            None => Color::Black,
            Some(entry) => entry.color.opposite(),
        }
    }

    /// SHA-256 hex digest of the concatenated history commands.
    pub fn history_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.history {
            hasher.update(entry.command().as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn clear_board(&mut self) -> Result<(), GtpError> {
        self.send_command("clear_board", 1, true)
    }

    /// Returns the engine's board diagram (printed on stderr).
    pub fn show_board(&mut self) -> Result<String, GtpError> {
        self.send_command("showboard", 1, false)?;
        let running = self.process.as_ref().ok_or(GtpError::NotRunning)?;
        let (_, stderr) = running.drain();
        Ok(stderr.join("\n"))
    }

    /// Clears the engine's board and replays the whole history in one batch.
    pub fn go_to_position(&mut self) -> Result<(), GtpError> {
        self.clear_board()?;
        if self.history.is_empty() {
            return Ok(());
        }
        let batch = self
            .history
            .iter()
            .map(HistoryEntry::command)
            .collect::<Vec<_>>()
            .join("\n");
        self.send_command(&batch, self.history.len(), true)
    }

    /// Runs a timed `genmove` for the side to move and collects all output.
    ///
    /// # Errors
    ///
    /// Returns [`GtpError::ProtocolTimeout`] if the engine printed nothing on
    /// stdout within twice the search time, and [`GtpError::EngineCrash`] if
    /// it exited during the search.
    pub fn generate_move(&mut self) -> Result<SearchOutput, GtpError> {
        let seconds = self.config.seconds_per_search;
        self.send_command(&format!("time_left black {} 1", seconds), 1, true)?;
        self.send_command(&format!("time_left white {} 1", seconds), 1, true)?;

        let to_move = self.whose_turn();
        let board = self.show_board()?;
        debug!("board state: {} to play\n{}", to_move, board);

        self.state = SessionState::Analyzing;
        let output = self.search(to_move);
        if self.process.is_some() {
            self.state = SessionState::Ready;
        }
        output
    }

    fn search(&mut self, to_move: Color) -> Result<SearchOutput, GtpError> {
        let budget = Duration::from_secs(self.config.seconds_per_search * 2);
        let poll_interval = self.config.poll_interval;
        let ctx = ParseContext {
            board_size: self.config.board_size,
            to_move,
        };
        let running = self.process.as_mut().ok_or(GtpError::NotRunning)?;
        let command = format!("genmove {}", to_move.gtp_name());

        running.write_line(&command)?;

        let deadline = Instant::now() + budget;
        let mut output = SearchOutput::default();
        let mut polls = 0;
        loop {
            let (out, err) = running.drain();
            for line in &err {
                self.parser.parse_status_update(line.trim(), &ctx);
            }
            output.stdout.extend(out);
            output.stderr.extend(err);

            if !output.stdout.is_empty() || Instant::now() >= deadline {
                break;
            }
            running.ensure_alive()?;
            polls += 1;
            thread::sleep(poll_interval);
        }

        // Confirm the generated move, then collect what is still in flight.
        running.write_line("")?;
        thread::sleep(poll_interval);
        let (out, err) = running.drain();
        output.stdout.extend(out);
        output.stderr.extend(err);

        if output.stdout.is_empty() {
            return Err(GtpError::ProtocolTimeout { command, tries: polls });
        }
        Ok(output)
    }

    /// Searches the current position and parses the engine output.
    pub fn analyze(&mut self) -> Result<AnalysisResult, GtpError> {
        let ctx = ParseContext {
            board_size: self.config.board_size,
            to_move: self.whose_turn(),
        };
        let output = self.generate_move()?;
        let result = self.parser.parse(&output.stdout, &output.stderr, &ctx);

        match (result.stats.winrate, result.best_candidate()) {
            (Some(winrate), Some(best)) => debug!(
                "suggested: {} (winrate {:.2}%, {} visits), PV: {}",
                best.pos,
                winrate * 100.0,
                result.stats.visits.unwrap_or(0),
                best.pv.join(" ")
            ),
            _ => debug!("chosen move: {:?}", result.stats.chosen),
        }

        Ok(result)
    }

    /// Shuts the engine down. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(mut running) = self.process.take() else {
            self.state = SessionState::Stopped;
            return;
        };
        info!("stopping GTP engine");
        self.state = SessionState::Stopping;

        running.stdout.stop();
        running.stderr.stop();
        let _ = running.write_line("quit");
        thread::sleep(self.config.shutdown_grace);
        if let Err(e) = running.child.kill() {
            debug!("kill after quit failed: {}", e);
        }
        let _ = running.child.wait();

        self.state = SessionState::Stopped;
        info!("GTP engine stopped");
    }

    /// Restarts the engine with an empty history.
    pub fn reset(&mut self) -> Result<(), GtpError> {
        self.stop();
        self.clear_history();
        self.start()
    }

    /// Restarts the engine, keeping the history so the position can be replayed.
    pub fn restart(&mut self) -> Result<(), GtpError> {
        self.stop();
        self.start()
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(handicap: u32) -> EngineSession {
        let mut config = SessionConfig::new("/nonexistent/engine", EngineKind::Leela);
        config.handicap = handicap;
        EngineSession::new(config)
    }

    #[test]
    fn test_new_session_is_stopped() {
        let s = session(0);
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_whose_turn_empty_history() {
        assert_eq!(session(0).whose_turn(), Color::Black);
        assert_eq!(session(2).whose_turn(), Color::White);
    }

    #[test]
    fn test_whose_turn_follows_last_entry() {
        let mut s = session(0);
        s.add_move(Color::Black, "pd").unwrap();
        assert_eq!(s.whose_turn(), Color::White);
        s.add_move(Color::White, "dp").unwrap();
        assert_eq!(s.whose_turn(), Color::Black);

        // setup stones added out of band
        s.add_move(Color::White, "dd").unwrap();
        assert_eq!(s.whose_turn(), Color::Black);
    }

    #[test]
    fn test_add_move_translates_coordinates() {
        let mut s = session(0);
        s.add_move(Color::Black, "dp").unwrap();
        s.add_move(Color::White, "").unwrap();
        s.add_move(Color::Black, "tt").unwrap();

        let commands: Vec<String> = s.history().iter().map(HistoryEntry::command).collect();
        assert_eq!(
            commands,
            vec!["play black D4", "play white pass", "play black pass"]
        );
    }

    #[test]
    fn test_add_move_rejects_out_of_range() {
        let mut config = SessionConfig::new("engine", EngineKind::Leela);
        config.board_size = 9;
        let mut s = EngineSession::new(config);

        assert!(matches!(
            s.add_move(Color::Black, "pp"),
            Err(CoordinateError::OutOfRange { .. })
        ));
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_pop_moves_and_clear() {
        let mut s = session(0);
        for (color, pos) in [(Color::Black, "pd"), (Color::White, "dp"), (Color::Black, "pp")] {
            s.add_move(color, pos).unwrap();
        }
        s.pop_moves(2);
        assert_eq!(s.history().len(), 1);
        s.pop_moves(5);
        assert!(s.history().is_empty());

        s.add_move(Color::Black, "pd").unwrap();
        s.clear_history();
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_history_hash_depends_on_history() {
        let mut a = session(0);
        let mut b = session(0);
        assert_eq!(a.history_hash(), b.history_hash());
        assert_eq!(a.history_hash().len(), 64);

        a.add_move(Color::Black, "pd").unwrap();
        assert_ne!(a.history_hash(), b.history_hash());

        b.add_move(Color::Black, "pd").unwrap();
        assert_eq!(a.history_hash(), b.history_hash());

        a.add_move(Color::White, "dp").unwrap();
        a.pop_moves(1);
        assert_eq!(a.history_hash(), b.history_hash());
    }

    #[test]
    fn test_commands_require_running_engine() {
        let mut s = session(0);
        assert!(matches!(s.clear_board(), Err(GtpError::NotRunning)));
        assert!(matches!(s.analyze(), Err(GtpError::NotRunning)));
    }

    #[test]
    fn test_start_reports_missing_executable() {
        let mut s = session(0);
        assert!(matches!(s.start(), Err(GtpError::Process(_))));
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[test]
    fn test_stop_is_idempotent_when_stopped() {
        let mut s = session(0);
        s.stop();
        s.stop();
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[test]
    fn test_set_seconds_per_search() {
        let mut s = session(0);
        s.set_seconds_per_search(3);
        assert_eq!(s.seconds_per_search(), 3);
    }
}
