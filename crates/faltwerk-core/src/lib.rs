// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Faltwerk — Core geometry types, error definitions, and cancellation shared
// across all crates.

pub mod cancel;
pub mod error;
pub mod geometry;

pub use cancel::CancelToken;
pub use error::FaltwerkError;
pub use geometry::*;
