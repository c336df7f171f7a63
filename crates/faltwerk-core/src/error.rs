// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Faltwerk.

use thiserror::Error;

/// Top-level error type for all Faltwerk operations.
#[derive(Debug, Error)]
pub enum FaltwerkError {
    // -- Image errors --
    #[error("image operation failed: {0}")]
    Image(String),

    // -- Warp errors --
    #[error("control points rejected: {0}")]
    ControlPoints(String),

    #[error("warp failed: {0}")]
    Warp(String),

    // -- Worker errors --
    #[error("correction worker failed: {0}")]
    Worker(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FaltwerkError>;
