// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persistent service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory the upload collaborator writes incoming files to.
    pub uploads_dir: PathBuf,
    /// Directory converted outputs, archives, and PDFs are persisted to.
    pub output_dir: PathBuf,
    /// Public URL prefix under which uploads are addressable.
    pub uploads_prefix: String,
    /// Public URL prefix under which outputs are addressable.
    pub output_prefix: String,
    /// Maximum age of ephemeral files before the retention sweep removes them.
    pub retention_max_age_secs: u64,
    /// How often the external scheduler is expected to run the sweep.
    pub sweep_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            uploads_prefix: "/uploads".into(),
            output_prefix: "/output".into(),
            retention_max_age_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}
