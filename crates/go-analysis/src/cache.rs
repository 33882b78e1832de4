//! On-disk memoization of analysis results.
//!
//! Every analyzed position is stored in its own JSON file, named after the
//! hash of the command history that reached it and the search time used.
//! Entries are never evicted, which makes an interrupted review resumable:
//! rerunning it only searches positions that have no file yet.

use crate::AnalysisError;
use gtp::AnalysisResult;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Identifies one analysis: the position's history hash plus the search time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub history_hash: String,
    pub seconds: u64,
}

impl CacheKey {
    pub fn new(history_hash: impl Into<String>, seconds: u64) -> Self {
        Self {
            history_hash: history_hash.into(),
            seconds,
        }
    }

    /// File name of the entry for this key.
    pub fn file_name(&self) -> String {
        format!("analyze_{}_{}sec.json", self.history_hash, self.seconds)
    }
}

/// SHA-256 hex digest of a game record's text, used to give every game its
/// own cache directory.
pub fn record_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// A directory of cached [`AnalysisResult`]s.
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    dir: PathBuf,
    skip_cached: bool,
}

impl AnalysisCache {
    /// Opens (creating if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            skip_cached: false,
        })
    }

    /// Opens the cache of one game: `<checkpoint_dir>/<bot>/<record digest>`.
    pub fn for_game(
        checkpoint_dir: &Path,
        bot: &str,
        record_text: &str,
    ) -> Result<Self, AnalysisError> {
        Self::open(checkpoint_dir.join(bot).join(record_digest(record_text)))
    }

    /// When set, existing entries are ignored and overwritten.
    pub fn with_skip_cached(mut self, skip_cached: bool) -> Self {
        self.skip_cached = skip_cached;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Returns the cached result for `key`, or computes and stores it.
    ///
    /// The flag is `true` for a cache hit. Unreadable or corrupt entries are
    /// logged and recomputed.
    ///
    /// # Errors
    ///
    /// Propagates errors from `compute`, and returns
    /// [`AnalysisError::Cache`] or [`AnalysisError::Io`] if the new entry
    /// cannot be written.
    pub fn get<F>(&self, key: &CacheKey, compute: F) -> Result<(AnalysisResult, bool), AnalysisError>
    where
        F: FnOnce() -> Result<AnalysisResult, AnalysisError>,
    {
        let path = self.path_for(key);

        if !self.skip_cached {
            if let Some(result) = self.load(&path) {
                debug!("loaded cache entry {}", path.display());
                return Ok((result, true));
            }
        }

        let result = compute()?;
        self.store(&path, &result)?;
        Ok((result, false))
    }

    fn load(&self, path: &Path) -> Option<AnalysisResult> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("cannot read cache entry {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("discarding corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn store(&self, path: &Path, result: &AnalysisResult) -> Result<(), AnalysisError> {
        let text = serde_json::to_string(result).map_err(|source| AnalysisError::Cache {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text)?;
        Ok(())
    }
}
