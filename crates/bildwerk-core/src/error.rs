// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bildwerk.

use thiserror::Error;

/// Top-level error type for all Bildwerk operations.
#[derive(Debug, Error)]
pub enum BildwerkError {
    // -- Validation errors --
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    // -- Codec errors --
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    // -- Merge precondition --
    #[error("need at least 2 valid images to merge, got {0}")]
    InsufficientInputs(usize),

    // -- Output containers --
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("archive operation failed: {0}")]
    Archive(String),

    // -- Storage / persistence --
    #[error("storage error: {0}")]
    Storage(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BildwerkError>;
