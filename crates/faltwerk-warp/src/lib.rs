// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Faltwerk — Warp primitive. Fits a coordinate mapping to control-point
// correspondences (bivariate polynomial or 4-point perspective) and resamples
// the source image through it into an arbitrary output viewport.

pub mod homography;
pub mod polynomial;
pub mod types;
pub mod warper;

pub use types::{Viewport, VirtualPixel};
pub use warper::{SoftwareWarper, Warper};
