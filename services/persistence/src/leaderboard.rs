//! Global leaderboard store: sorted, capped JSON file
//!
//! Every completed session appends one row per participant. After each
//! append batch the collection is sorted descending by net worth and
//! truncated to `capacity`, then written atomically (tmp file, fsync,
//! rename).
//!
//! An absent or unreadable file is treated as an empty leaderboard.

use chrono::Utc;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};
use types::ids::ParticipantId;
use types::leaderboard::{by_networth_desc, GlobalLeaderboardEntry};

/// Number of rows kept on disk.
pub const DEFAULT_CAPACITY: usize = 100;

/// Number of rows returned for display.
pub const TOP_N: usize = 10;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Store ───────────────────────────────────────────────────────────

/// File-backed global leaderboard.
///
/// Read-modify-write cycles are serialized by an internal mutex, so one
/// store instance is the single writer of its file.
pub struct GlobalLeaderboardStore {
    path: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl GlobalLeaderboardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `results` stamped with the current time, re-rank, cap, persist
    /// and return the top `TOP_N` rows.
    pub fn append_and_rank(
        &self,
        results: &[(ParticipantId, f64)],
    ) -> Result<Vec<GlobalLeaderboardEntry>, LeaderboardError> {
        let _guard = self.lock();

        let mut entries = self.load();
        let timestamp = Utc::now();
        entries.extend(results.iter().map(|(player_id, networth)| {
            GlobalLeaderboardEntry {
                player_id: player_id.clone(),
                networth: *networth,
                timestamp,
            }
        }));

        rank(&mut entries, self.capacity);
        self.save(&entries)?;

        info!(
            appended = results.len(),
            stored = entries.len(),
            path = %self.path.display(),
            "Saved results to global leaderboard"
        );

        entries.truncate(TOP_N);
        Ok(entries)
    }

    /// Highest `n` stored rows.
    pub fn top(&self, n: usize) -> Vec<GlobalLeaderboardEntry> {
        let _guard = self.lock();
        let mut entries = self.load();
        entries.truncate(n);
        entries
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load stored rows; a missing or corrupt file yields an empty list.
    fn load(&self) -> Vec<GlobalLeaderboardEntry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Global leaderboard unreadable, starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Global leaderboard corrupt, starting empty"
                );
                Vec::new()
            }
        }
    }

    fn save(&self, entries: &[GlobalLeaderboardEntry]) -> Result<(), LeaderboardError> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(entries)?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        // Atomic write: write to tmp, fsync, rename
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Stable sort descending by net worth, then cap at `capacity`.
fn rank(entries: &mut Vec<GlobalLeaderboardEntry>, capacity: usize) {
    entries.sort_by(|a, b| by_networth_desc(a.networth, b.networth));
    entries.truncate(capacity);
}

// ── Tests ───────────────────────────────────────────────────────────


// ── Property-Based Tests ────────────────────────────────────────────

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    proptest! {
        #[test]
        fn prop_store_stays_sorted_and_capped(
            batches in prop::collection::vec(
                prop::collection::vec(0.0f64..1_000_000.0, 0..40),
                1..6,
            ),
        ) {
            let tmp = TempDir::new().unwrap();
            let store = GlobalLeaderboardStore::with_capacity(tmp.path().join("board.json"), 50);

            for (b, batch) in batches.iter().enumerate() {
                let results: Vec<_> = batch
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (ParticipantId::new(format!("P{b}-{i}")), *n))
                    .collect();
                store.append_and_rank(&results).unwrap();
            }

            let all = store.top(usize::MAX);
            let total: usize = batches.iter().map(Vec::len).sum();
            prop_assert_eq!(all.len(), total.min(50));
            prop_assert!(all.windows(2).all(|w| w[0].networth >= w[1].networth));
        }
    }
}
