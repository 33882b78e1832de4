//! Background line reader for one engine output stream.
//!
//! Engines write output in bursts and stdout and stderr must both be
//! drained independently, otherwise a full pipe buffer stalls the engine.
//! Each [`PipeReader`] owns a dedicated thread doing blocking reads and
//! hands complete lines to the foreground through an unbounded queue.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Pause after a failed read before trying again.
const READ_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Non-blocking view over lines read from a stream by a background thread.
pub struct PipeReader {
    name: &'static str,
    lines: Receiver<String>,
    stopped: Arc<AtomicBool>,
}

impl PipeReader {
    /// Starts reading `stream` on a new thread.
    ///
    /// The thread runs until the stream reaches end-of-file or [`stop`]
    /// has been called and the next line arrives.
    ///
    /// [`stop`]: Self::stop
    pub fn spawn<R>(name: &'static str, stream: R) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);

        thread::Builder::new()
            .name(format!("gtp-{}", name))
            .spawn(move || read_loop(name, stream, tx, flag))?;

        Ok(Self {
            name,
            lines: rx,
            stopped,
        })
    }

    /// Returns the next queued line, or an empty string if none is queued.
    pub fn read_line(&self) -> String {
        match self.lines.try_recv() {
            Ok(line) => line,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => String::new(),
        }
    }

    /// Removes and returns every queued line, oldest first.
    pub fn drain_all(&self) -> Vec<String> {
        self.lines.try_iter().collect()
    }

    /// Signals the reader thread to finish. Does not wait for it.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(stream = self.name, "pipe reader stop requested");
        }
    }

    #[cfg(test)]
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<R: Read>(name: &'static str, stream: R, tx: Sender<String>, stopped: Arc<AtomicBool>) {
    let mut reader = BufReader::new(stream);
    let mut buf = String::new();

    while !stopped.load(Ordering::SeqCst) {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => {
                trace!(stream = name, "end of stream");
                break;
            }
            Ok(_) => {
                let line = buf.trim_end_matches(['\r', '\n']);
                if line.is_empty() {
                    continue;
                }
                trace!(stream = name, "<< {}", line);
                if tx.send(line.to_string()).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(stream = name, error = %e, "read failed, retrying");
                thread::sleep(READ_RETRY_DELAY);
            }
        }
    }
}
