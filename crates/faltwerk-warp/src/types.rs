// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parameter types shared by all warp backends.

/// Output raster geometry of a single warp invocation.
///
/// The viewport's pixel `(col, row)` corresponds to destination coordinate
/// `(x_offset + col, y_offset + row)`, so a warp can render a sub-region of a
/// larger destination space without recomputing its control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub x_offset: i64,
    pub y_offset: i64,
}

impl Viewport {
    /// Viewport anchored at the destination origin.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x_offset: 0,
            y_offset: 0,
        }
    }

    /// Viewport covering a sub-region of the destination space.
    pub fn offset(width: u32, height: u32, x_offset: i64, y_offset: i64) -> Self {
        Self {
            width,
            height,
            x_offset,
            y_offset,
        }
    }
}

/// Fill policy for samples that fall outside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualPixel {
    /// Repeat the nearest edge pixel.
    EdgeClamp,
    /// Emit fully transparent pixels.
    Transparent,
}
