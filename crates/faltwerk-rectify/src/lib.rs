// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// faltwerk-rectify — Geometry correction for photographed documents.
//
// Provides boundary detection (quadrilateral candidates ranked by confidence)
// and four correction pipelines: control-grid straightening, wavy-edge
// correction, curvature unwarping (whole image or patch), and tri-fold
// flattening. All pipelines feed control-point pairs into a `Warper` backend
// and degrade to `None` on failure instead of erroring past the API boundary.

pub mod curves;
pub mod detect;
pub mod edge;
pub mod grid;
pub mod offload;
pub mod trifold;
pub mod unwarp;

// Re-export the primary types so callers can use `faltwerk_rectify::EdgeCorrector` etc.
pub use detect::{DetectorOptions, detect_document_quads, detect_document_quads_at};
pub use edge::{EdgeCorrector, RectEdge, classify_point_to_edge};
pub use grid::{GridStraightener, generate_regular_grid};
pub use offload::offload;
pub use trifold::{TriFoldCorrector, TriFoldPoints};
pub use unwarp::UnwarpCorrector;

/// Corrections refuse to produce rasters smaller than this on either side.
pub(crate) const MIN_OUTPUT_SIDE: u32 = 10;

#[cfg(test)]
pub(crate) mod testutil;
