// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retention sweep over the ephemeral file stores.
//
// Uploads and outputs live only long enough for the client to fetch them.
// The sweeper is a collaborator an external scheduler calls on its own
// cadence — the engine never spawns timers of its own, so embedding hosts
// keep full control of background work.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use bildwerk_core::ServiceConfig;
use bildwerk_core::error::Result;
use tracing::{debug, info, instrument, warn};

/// Deletes files past their retention age from the managed directories.
pub struct RetentionSweeper {
    dirs: Vec<PathBuf>,
}

impl RetentionSweeper {
    /// Sweep the given directories.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Sweep the uploads and output directories of a configured service.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(vec![
            config.uploads_dir.clone(),
            config.output_dir.clone(),
        ])
    }

    /// Delete every regular file whose mtime is older than `older_than`.
    ///
    /// Returns the number of files removed. Individual deletions that fail
    /// are logged and skipped; the sweep finishes the remaining entries.
    #[instrument(skip(self), fields(older_than_secs = older_than.as_secs()))]
    pub async fn sweep(&self, older_than: Duration) -> Result<usize> {
        let Some(cutoff) = SystemTime::now().checked_sub(older_than) else {
            return Ok(0);
        };

        let mut removed = 0usize;
        for dir in &self.dirs {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(dir = %dir.display(), %err, "sweep directory unavailable");
                    continue;
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                if !meta.is_file() {
                    continue;
                }
                let Ok(modified) = meta.modified() else {
                    continue;
                };
                if modified > cutoff {
                    continue;
                }

                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => {
                        debug!(file = %entry.path().display(), "stale file removed");
                        removed += 1;
                    }
                    Err(err) => {
                        warn!(file = %entry.path().display(), %err, "failed to remove stale file");
                    }
                }
            }
        }

        info!(removed, "Retention sweep finished");
        Ok(removed)
    }
}
