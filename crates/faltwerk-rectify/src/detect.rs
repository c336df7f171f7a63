// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection — finds candidate document quadrilaterals in a
// photograph via edge detection, contour tracing, and polygon approximation,
// then ranks them by a confidence score.

use faltwerk_core::geometry::{DetectionResult, Point, Quadrilateral};
use image::DynamicImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point as ImagePoint;
use tracing::{debug, instrument, warn};

/// Tuning knobs for document boundary detection.
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Maximum number of ranked candidates to return.
    pub max_results: usize,
    /// Minimum candidate area as a fraction of the image area.
    pub min_area_fraction: f64,
    /// Gaussian blur sigma applied before edge detection.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Dilation radius used to bridge small gaps in detected edges.
    pub dilation_radius: u8,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_area_fraction: 0.05,
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            dilation_radius: 2,
        }
    }
}

/// Detect document candidates in an image file.
///
/// Never fails: an unreadable or undecodable file logs a warning and returns
/// an empty result.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn detect_document_quads_at(
    path: impl AsRef<std::path::Path>,
    options: &DetectorOptions,
) -> DetectionResult {
    match image::open(path.as_ref()) {
        Ok(image) => detect_document_quads(&image, options),
        Err(err) => {
            warn!(error = %err, "Detection skipped: source image unreadable");
            DetectionResult::empty()
        }
    }
}

/// Detect document candidates in a decoded image.
///
/// ## Pipeline
///
/// 1. Convert to grayscale
/// 2. Gaussian blur for noise reduction
/// 3. Canny edge detection
/// 4. Dilate edges to bridge small gaps
/// 5. Trace external contours
/// 6. Approximate each contour to a polygon (tolerance 2% of its perimeter)
///    and keep convex 4-vertex results above the area threshold
/// 7. Score candidates and return the top `max_results` by confidence
///
/// The confidence score blends relative area (60%) with rectangularity (40%),
/// where rectangularity measures how far the interior angles deviate from 90
/// degrees.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn detect_document_quads(image: &DynamicImage, options: &DetectorOptions) -> DetectionResult {
    let (width, height) = (image.width(), image.height());
    let image_area = f64::from(width) * f64::from(height);
    if image_area == 0.0 {
        warn!("Detection skipped: empty image");
        return DetectionResult::empty();
    }

    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, options.blur_sigma);
    let edges = canny(&blurred, options.canny_low, options.canny_high);
    let bridged = imageproc::morphology::dilate(&edges, Norm::LInf, options.dilation_radius);

    let contours: Vec<Contour<u32>> = find_contours(&bridged);
    debug!(contours = contours.len(), "Contours traced");

    let min_area = options.min_area_fraction * image_area;
    let mut quads: Vec<Quadrilateral> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter_map(|c| quad_from_contour(&c.points, min_area, image_area))
        .collect();

    quads.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    quads.truncate(options.max_results);
    debug!(candidates = quads.len(), "Document candidates ranked");

    DetectionResult {
        width,
        height,
        quads,
    }
}

// -- Contour analysis ---------------------------------------------------------

/// Reduce one traced contour to a scored quadrilateral, or reject it.
fn quad_from_contour(
    points: &[ImagePoint<u32>],
    min_area: f64,
    image_area: f64,
) -> Option<Quadrilateral> {
    if points.len() < 4 {
        return None;
    }

    let outline: Vec<Point> = points
        .iter()
        .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
        .collect();
    if polygon_area(&outline) < min_area {
        return None;
    }

    let tolerance = 0.02 * perimeter(&outline);
    let approx = approximate_polygon_dp(points, tolerance, true);
    if approx.len() != 4 {
        return None;
    }

    let corners = [
        Point::new(f64::from(approx[0].x), f64::from(approx[0].y)),
        Point::new(f64::from(approx[1].x), f64::from(approx[1].y)),
        Point::new(f64::from(approx[2].x), f64::from(approx[2].y)),
        Point::new(f64::from(approx[3].x), f64::from(approx[3].y)),
    ];
    if !is_convex(&corners) {
        return None;
    }

    let area = polygon_area(&corners);
    if area < min_area {
        return None;
    }

    let confidence = 0.6 * (area / image_area).min(1.0) + 0.4 * rectangularity(&corners);
    Some(Quadrilateral::from_unordered(corners, area, confidence))
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area.abs() / 2.0
}

/// Length of a closed polygon's boundary.
fn perimeter(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].distance_to(points[(i + 1) % n]))
        .sum()
}

/// Whether four corners in traversal order form a convex quadrilateral.
///
/// All cross products of consecutive edge vectors must share a sign; a zero
/// cross product (collapsed or collinear corner) counts as non-convex.
fn is_convex(corners: &[Point; 4]) -> bool {
    let mut sign = 0.0;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let c = corners[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// How rectangular a convex quadrilateral is, in `[0, 1]`.
///
/// Averages each interior angle's deviation from 90 degrees and maps it
/// linearly: no deviation scores 1.0, an average of 45 degrees or more
/// scores 0.0.
fn rectangularity(corners: &[Point; 4]) -> f64 {
    let mut total_deviation = 0.0;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let at = corners[i];
        let next = corners[(i + 1) % 4];

        let v1 = (prev.x - at.x, prev.y - at.y);
        let v2 = (next.x - at.x, next.y - at.y);
        let len1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
        let len2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
        if len1 < 1e-9 || len2 < 1e-9 {
            return 0.0;
        }

        let cos = ((v1.0 * v2.0 + v1.1 * v2.1) / (len1 * len2)).clamp(-1.0, 1.0);
        let angle = cos.acos().to_degrees();
        total_deviation += (angle - 90.0).abs();
    }
    (1.0 - total_deviation / 4.0 / 45.0).max(0.0)
}

// -- Tests --------------------------------------------------------------------
