// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan-quality scoring — fill, stability, sharpness proxy, and geometric
// confidence blended into one 0-100 score with a recommendation.
//
// No pixel access is assumed: "sharpness" is an angle-regularity proxy, and
// "confidence" is geometric unless the detector supplies its own.

use scanwerk_core::{DisplayColor, FrameSize, QualityLevel, Quad, Recommendation};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry;
use crate::stability::StabilityTracker;

/// Lower edge of the optimal fill band.
pub const FILL_BAND_MIN: f64 = 0.60;
/// Upper edge of the optimal fill band.
pub const FILL_BAND_MAX: f64 = 0.90;

/// Trailing window inspected for stability.
pub const STABILITY_WINDOW_MS: u64 = 500;
/// Samples needed in-window before movement is measured.
pub const MIN_STABILITY_SAMPLES: usize = 5;

pub const FILL_WEIGHT: f64 = 0.25;
pub const STABILITY_WEIGHT: f64 = 0.30;
pub const SHARPNESS_WEIGHT: f64 = 0.25;
pub const CONFIDENCE_WEIGHT: f64 = 0.20;

/// Per-frame scan-readiness score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScore {
    /// How well the document fills the frame (0-100).
    pub fill: f64,
    /// How still the outline has been recently (0-100).
    pub stability: f64,
    /// Angle-regularity stand-in for optical sharpness (0-100).
    pub sharpness: f64,
    /// Geometric (or detector-reported) confidence (0-100).
    pub confidence: f64,
    /// Weighted composite, rounded.
    pub overall: u8,
    pub level: QualityLevel,
    pub color: DisplayColor,
    pub recommendation: Recommendation,
    /// Raw quad-area / frame-area ratio behind `fill`, clamped to [0, 1].
    pub fill_ratio: f64,
}

impl QualityScore {
    /// Score for a frame with no usable outline.
    pub fn no_detection() -> Self {
        Self {
            fill: 0.0,
            stability: 0.0,
            sharpness: 0.0,
            confidence: 0.0,
            overall: 0,
            level: QualityLevel::Poor,
            color: QualityLevel::Poor.color(),
            recommendation: Recommendation::PositionDocument,
            fill_ratio: 0.0,
        }
    }

    pub fn is_good(&self) -> bool {
        self.level == QualityLevel::Good
    }
}

/// Score one frame.
///
/// `history` should already contain the current sample; the stability score
/// compares `quad` against everything in the trailing window.
/// `detector_confidence` (0.0-1.0), when present, replaces the geometric
/// confidence sub-score.
pub fn score_frame(
    quad: &Quad,
    frame: FrameSize,
    history: &StabilityTracker,
    detector_confidence: Option<f64>,
) -> QualityScore {
    if !quad.is_finite() {
        return QualityScore::no_detection();
    }

    let ratio = fill_ratio(quad, frame);
    let fill = fill_score(ratio);
    let stability = stability_score(quad, history);
    let sharpness = sharpness_score(quad);
    let confidence = match detector_confidence {
        Some(c) if c.is_finite() => (c.clamp(0.0, 1.0) * 100.0).round(),
        _ => confidence_score(quad),
    };

    let overall = composite(fill, stability, sharpness, confidence);
    let level = QualityLevel::from_overall(overall);
    let recommendation = recommend(level, fill, ratio, stability);

    trace!(
        fill,
        stability,
        sharpness,
        confidence,
        overall,
        ?level,
        "frame scored"
    );

    QualityScore {
        fill,
        stability,
        sharpness,
        confidence,
        overall,
        level,
        color: level.color(),
        recommendation,
        fill_ratio: ratio,
    }
}

// -- Sub-scores ---------------------------------------------------------------

/// Quad area over frame area, clamped to [0, 1]. An empty frame yields 0.
pub fn fill_ratio(quad: &Quad, frame: FrameSize) -> f64 {
    let frame_area = frame.area();
    if frame_area <= 0.0 {
        return 0.0;
    }
    (geometry::area(quad) / frame_area).clamp(0.0, 1.0)
}

/// Map a fill ratio to 0-100.
///
/// Inside the [0.60, 0.90] band the score is 100. Below it the score ramps
/// linearly up to 70 at the band edge; above it the score drops by 60 per
/// 0.10 of overflow, floored at 40.
pub fn fill_score(fill_ratio: f64) -> f64 {
    if !fill_ratio.is_finite() {
        return 0.0;
    }
    let ratio = fill_ratio.clamp(0.0, 1.0);
    if ratio < FILL_BAND_MIN {
        ratio / FILL_BAND_MIN * 70.0
    } else if ratio > FILL_BAND_MAX {
        (100.0 - (ratio - FILL_BAND_MAX) / 0.10 * 60.0).max(40.0)
    } else {
        100.0
    }
}

/// Movement-based stability over the trailing [`STABILITY_WINDOW_MS`].
///
/// Empty history scores 0. With fewer than [`MIN_STABILITY_SAMPLES`]
/// in-window samples the score ramps as `count / 5 * 50`. Otherwise the
/// largest corner displacement against any in-window sample is tiered:
/// <=10px 100, <=20px 70, <=30px 40, else 20.
pub fn stability_score(quad: &Quad, history: &StabilityTracker) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let mut count = 0usize;
    let mut max_move = 0.0f64;
    for sample in history.samples_within(STABILITY_WINDOW_MS) {
        count += 1;
        max_move = max_move.max(geometry::max_corner_displacement(quad, &sample.quad));
    }

    if count < MIN_STABILITY_SAMPLES {
        return count as f64 * 50.0 / MIN_STABILITY_SAMPLES as f64;
    }

    if max_move <= 10.0 {
        100.0
    } else if max_move <= 20.0 {
        70.0
    } else if max_move <= 30.0 {
        40.0
    } else {
        20.0
    }
}

/// Angle-regularity proxy for sharpness.
pub fn sharpness_score(quad: &Quad) -> f64 {
    let deviation = geometry::mean_right_angle_deviation(quad);
    if deviation < 5.0 {
        100.0
    } else if deviation < 10.0 {
        80.0
    } else if deviation < 20.0 {
        60.0
    } else {
        40.0
    }
}

/// Geometric confidence: 20 for anything that does not pass the rectangle
/// heuristic, otherwise tiered on angle deviation.
pub fn confidence_score(quad: &Quad) -> f64 {
    if !geometry::is_rectangular_quad(quad) {
        return 20.0;
    }
    let deviation = geometry::mean_right_angle_deviation(quad);
    if deviation < 5.0 {
        100.0
    } else if deviation < 10.0 {
        85.0
    } else if deviation < 20.0 {
        70.0
    } else {
        50.0
    }
}

/// Weighted blend of the four sub-scores, rounded to 0-100.
pub fn composite(fill: f64, stability: f64, sharpness: f64, confidence: f64) -> u8 {
    let blended = FILL_WEIGHT * fill
        + STABILITY_WEIGHT * stability
        + SHARPNESS_WEIGHT * sharpness
        + CONFIDENCE_WEIGHT * confidence;
    if blended.is_finite() {
        blended.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

// -- Recommendation -----------------------------------------------------------

/// Pick the prompt for the weakest signal.
///
/// Checked in a fixed order: fill first, then stability, then a generic
/// lighting/focus fallback. Poor frames use a lower bar (50) than fair ones
/// (70) before blaming a single signal.
fn recommend(level: QualityLevel, fill: f64, fill_ratio: f64, stability: f64) -> Recommendation {
    let floor = match level {
        QualityLevel::Good => return Recommendation::ReadyToCapture,
        QualityLevel::Fair => 70.0,
        QualityLevel::Poor => 50.0,
    };

    if fill < floor {
        if fill_ratio > FILL_BAND_MAX {
            Recommendation::MoveFarther
        } else {
            Recommendation::MoveCloser
        }
    } else if stability < floor {
        Recommendation::HoldSteady
    } else {
        Recommendation::ImproveLightingOrFocus
    }
}
