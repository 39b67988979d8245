// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop geometry — corner canonicalisation, crop validation, fallback corners,
// output sizing, and normalised coordinates for the external warp step.
//
// A capture always produces corners: if the candidate outline fails
// validation, a centred inset rectangle is substituted with a low fixed
// confidence.

use scanwerk_core::error::{Result, ScanError};
use scanwerk_core::{FrameSize, Point, Quad};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geometry;

/// Default inset for fallback corners, as a fraction of each frame side.
pub const DEFAULT_INSET: f64 = 0.05;

/// Confidence attached to fallback corners.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Crops smaller than this fraction of the frame are rejected.
pub const MIN_AREA_RATIO: f64 = 0.10;

/// Largest fallback inset whose rectangle still covers [`MIN_AREA_RATIO`]
/// of the frame: `(1 - sqrt(0.10)) / 2`, rounded down.
pub const MAX_INSET: f64 = 0.34;

/// Corners closer than this (in pixels) are considered coincident.
pub const MIN_CORNER_DISTANCE_PX: f64 = 20.0;

/// Size of the rectified output image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

/// Why a candidate crop was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
pub enum QuadRejection {
    #[error("corner coordinates are not finite")]
    NonFinite,

    #[error("frame has zero size")]
    EmptyFrame,

    #[error("corner {corner} lies outside the frame")]
    OutOfBounds { corner: usize },

    #[error("corners are {distance:.1}px apart, minimum is {min:.1}px")]
    CornersTooClose { distance: f64, min: f64 },

    #[error("crop area {area:.0} is below the minimum {min_area:.0}")]
    TooSmall { area: f64, min_area: f64 },

    #[error("outline is not convex")]
    NotConvex,
}

/// Final corners handed to the warp step after a capture decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropResult {
    pub corners: Quad,
    pub size: OutputSize,
    /// 0.0-1.0; [`FALLBACK_CONFIDENCE`] when fallback corners were used.
    pub confidence: f64,
    pub used_fallback: bool,
    /// Why the candidate was rejected, if it was.
    pub rejection: Option<QuadRejection>,
}

// -- Sizing and defaults ------------------------------------------------------

/// Rectified output size: the longer of each pair of opposite edges, so a
/// skewed outline is never clipped.
pub fn output_dimensions(quad: &Quad) -> OutputSize {
    let [top, right, bottom, left] = geometry::edge_lengths(quad);
    OutputSize {
        width: top.max(bottom).round() as u32,
        height: left.max(right).round() as u32,
    }
}

/// Centred axis-aligned rectangle inset by `inset` (fraction of each side,
/// clamped to 0.0-[`MAX_INSET`] so the result always validates).
pub fn default_corners(frame: FrameSize, inset: f64) -> Quad {
    let inset = if inset.is_finite() { inset.clamp(0.0, MAX_INSET) } else { DEFAULT_INSET };
    let (w, h) = (frame.width as f64, frame.height as f64);
    Quad::from_rect(w * inset, h * inset, w * (1.0 - inset), h * (1.0 - inset))
}

/// Canonicalise four unordered points into TL, TR, BR, BL.
///
/// Points are split on the median y into a top and a bottom pair; each pair
/// is then ordered by x.
pub fn order_corners(points: &[Point]) -> Result<Quad> {
    let mut pts: [Point; 4] = points
        .try_into()
        .map_err(|_| ScanError::InvalidPointCount(points.len()))?;
    if !pts.iter().all(Point::is_finite) {
        return Err(ScanError::NonFiniteCoordinate);
    }

    pts.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    let (mut top, mut bottom) = ([pts[0], pts[1]], [pts[2], pts[3]]);
    top.sort_by(|a, b| a.x.total_cmp(&b.x));
    bottom.sort_by(|a, b| a.x.total_cmp(&b.x));

    Ok(Quad::new(top[0], top[1], bottom[1], bottom[0]))
}

// -- Validation ---------------------------------------------------------------

/// Minimum corner separation for a frame: [`MIN_CORNER_DISTANCE_PX`], scaled
/// down for frames too small to fit it.
pub fn min_corner_separation(frame: FrameSize) -> f64 {
    let short_side = frame.width.min(frame.height) as f64;
    MIN_CORNER_DISTANCE_PX.min(short_side * 0.05)
}

/// Check a candidate crop, reporting the first failed rule.
///
/// Rules, in order: finite corners, non-empty frame, every corner inside
/// `[0, w] x [0, h]`, pairwise corner separation, area of at least 10% of the
/// frame, convexity.
pub fn check(quad: &Quad, frame: FrameSize) -> std::result::Result<(), QuadRejection> {
    if !quad.is_finite() {
        return Err(QuadRejection::NonFinite);
    }
    if frame.is_empty() {
        return Err(QuadRejection::EmptyFrame);
    }

    let (w, h) = (frame.width as f64, frame.height as f64);
    let points = quad.points();
    if let Some(corner) = points
        .iter()
        .position(|p| p.x < 0.0 || p.y < 0.0 || p.x > w || p.y > h)
    {
        return Err(QuadRejection::OutOfBounds { corner });
    }

    let min = min_corner_separation(frame);
    for i in 0..4 {
        for j in (i + 1)..4 {
            let distance = geometry::distance(points[i], points[j]);
            if distance < min {
                return Err(QuadRejection::CornersTooClose { distance, min });
            }
        }
    }

    let area = geometry::area(quad);
    let min_area = MIN_AREA_RATIO * frame.area();
    if area < min_area {
        return Err(QuadRejection::TooSmall { area, min_area });
    }

    if !geometry::is_convex_quad(quad) {
        return Err(QuadRejection::NotConvex);
    }
    Ok(())
}

/// Whether `quad` is an acceptable crop for `frame`.
pub fn validate(quad: &Quad, frame: FrameSize) -> bool {
    check(quad, frame).is_ok()
}

/// Decide the final crop for a capture.
///
/// A valid candidate is kept with `confidence`; a missing or invalid one is
/// replaced by [`default_corners`] at [`FALLBACK_CONFIDENCE`]. Never fails.
pub fn resolve_capture(
    candidate: Option<&Quad>,
    frame: FrameSize,
    inset: f64,
    confidence: f64,
) -> CropResult {
    let rejection = match candidate {
        Some(quad) => check(quad, frame).err(),
        None => None,
    };

    match (candidate, rejection) {
        (Some(quad), None) => {
            debug!(confidence, "capture uses detected corners");
            CropResult {
                corners: *quad,
                size: output_dimensions(quad),
                confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 },
                used_fallback: false,
                rejection: None,
            }
        }
        _ => {
            let corners = default_corners(frame, inset);
            match rejection {
                Some(reason) => warn!(%reason, "capture corners rejected; using fallback corners"),
                None => debug!("no corners supplied; using fallback corners"),
            }
            CropResult {
                corners,
                size: output_dimensions(&corners),
                confidence: FALLBACK_CONFIDENCE,
                used_fallback: true,
                rejection,
            }
        }
    }
}

// -- Coordinate conversion ----------------------------------------------------

/// Pixel point to [0, 1] frame-relative coordinates. Zero dimensions map to 0.
pub fn normalize_point(point: Point, frame: FrameSize) -> Point {
    Point::new(ratio(point.x, frame.width), ratio(point.y, frame.height))
}

/// [0, 1] frame-relative point back to pixels.
pub fn denormalize_point(point: Point, frame: FrameSize) -> Point {
    Point::new(point.x * frame.width as f64, point.y * frame.height as f64)
}

pub fn normalize_quad(quad: &Quad, frame: FrameSize) -> Quad {
    quad.map(|p| normalize_point(p, frame))
}

pub fn denormalize_quad(quad: &Quad, frame: FrameSize) -> Quad {
    quad.map(|p| denormalize_point(p, frame))
}

fn ratio(value: f64, extent: u32) -> f64 {
    if extent == 0 { 0.0 } else { value / extent as f64 }
}
