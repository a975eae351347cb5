// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch archive — an incrementally populated zip container holding every
// output of one conversion request.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use bildwerk_core::error::{BildwerkError, Result};
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip container populated entry-by-entry as a batch progresses.
///
/// Created once per batch, fed one entry per produced output, and sealed
/// exactly once after every input was attempted. A batch that skipped
/// inputs still seals a valid, smaller archive; a failed seal is a
/// request-level error — callers never hand out a half-written archive.
pub struct BatchArchive {
    writer: ZipWriter<File>,
    filename: String,
    entries: usize,
}

impl BatchArchive {
    /// Create the archive file inside `dir`.
    #[instrument(skip(dir), fields(filename))]
    pub fn create(dir: &Path, filename: String) -> Result<Self> {
        let file = File::create(dir.join(&filename))
            .map_err(|err| BildwerkError::Archive(format!("create {filename}: {err}")))?;
        debug!("Archive opened");
        Ok(Self {
            writer: ZipWriter::new(file),
            filename,
            entries: 0,
        })
    }

    /// Append one output buffer under the given entry name.
    pub fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9));

        self.writer
            .start_file(name, options)
            .map_err(|err| BildwerkError::Archive(format!("start entry {name}: {err}")))?;
        self.writer
            .write_all(bytes)
            .map_err(|err| BildwerkError::Archive(format!("write entry {name}: {err}")))?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries added so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Finalize the archive and return its filename.
    pub fn seal(self) -> Result<String> {
        self.writer
            .finish()
            .map_err(|err| BildwerkError::Archive(format!("finalize {}: {err}", self.filename)))?;
        info!(filename = %self.filename, entries = self.entries, "Archive sealed");
        Ok(self.filename)
    }
}
