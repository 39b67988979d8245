// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.
//
// Only the outer surface (corner canonicalisation, frame setup, config
// loading) is fallible. Per-frame scoring and capture decisions never return
// errors; they degrade to sentinel scores instead.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Geometry input --
    #[error("expected exactly 4 corner points, got {0}")]
    InvalidPointCount(usize),

    #[error("corner coordinates must be finite")]
    NonFiniteCoordinate,

    #[error("invalid frame size {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
