// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk capture core.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monotonic timestamp in milliseconds, supplied by the host per frame.
pub type TimestampMs = u64;

/// Unique identifier for a scan session (one camera session, many frames).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 2D coordinate. Frame-pixel space unless a function says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite (no NaN, no infinity).
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A candidate document outline.
///
/// Corner order is a contract: top-left, top-right, bottom-right, bottom-left.
/// Unordered detector output must be canonicalised with
/// `scanwerk_vision::crop::order_corners` before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Quad {
    pub const fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Build from `[tl, tr, br, bl]`.
    pub const fn from_points(points: [Point; 4]) -> Self {
        Self::new(points[0], points[1], points[2], points[3])
    }

    /// Corners as `[tl, tr, br, bl]`.
    pub const fn points(&self) -> [Point; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Axis-aligned rectangle spanning `(left, top)` to `(right, bottom)`.
    pub const fn from_rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.points().iter().all(Point::is_finite)
    }

    /// Apply `f` to every corner, keeping the order.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Self {
        let [tl, tr, br, bl] = self.points();
        Self::new(f(tl), f(tr), f(br), f(bl))
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Like [`FrameSize::new`] but rejects zero dimensions.
    pub fn try_new(width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(crate::ScanError::InvalidFrameSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Frame area in square pixels (0 for an empty frame).
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A quad observed at a point in time; the unit stored in stability history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerSample {
    pub quad: Quad,
    pub timestamp_ms: TimestampMs,
}

/// Discrete scan-readiness level derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Poor,
    Fair,
    Good,
}

impl QualityLevel {
    /// Overall score at or above which a frame is `Good`.
    pub const GOOD_THRESHOLD: u8 = 70;
    /// Overall score at or above which a frame is at least `Fair`.
    pub const FAIR_THRESHOLD: u8 = 40;

    pub fn from_overall(overall: u8) -> Self {
        if overall >= Self::GOOD_THRESHOLD {
            Self::Good
        } else if overall >= Self::FAIR_THRESHOLD {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Overlay colour for this level.
    pub fn color(&self) -> DisplayColor {
        match self {
            Self::Good => DisplayColor::Green,
            Self::Fair => DisplayColor::Yellow,
            Self::Poor => DisplayColor::Red,
        }
    }
}

/// Overlay colour handed to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Green,
    Yellow,
    Red,
}

impl DisplayColor {
    /// CSS-style hex colour.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Green => "#34c759",
            Self::Yellow => "#ffcc00",
            Self::Red => "#ff3b30",
        }
    }
}

/// What the user should do next to improve the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Frame is good; keep still for auto-capture.
    ReadyToCapture,
    /// Document fills too little of the frame.
    MoveCloser,
    /// Document overflows the optimal zone.
    MoveFarther,
    /// Outline is jittering between frames.
    HoldSteady,
    /// Geometry is fine but the frame still scores low.
    ImproveLightingOrFocus,
    /// Nothing usable was detected in this frame.
    PositionDocument,
}

impl Recommendation {
    /// Plain-English prompt for the overlay.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ReadyToCapture => "Looks good. Hold still.",
            Self::MoveCloser => "Move closer to the document.",
            Self::MoveFarther => "Move back so the whole document fits.",
            Self::HoldSteady => "Hold the camera steady.",
            Self::ImproveLightingOrFocus => "Improve the lighting or tap to focus.",
            Self::PositionDocument => "Point the camera at a document.",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Scan-mode presets. Each maps to a fixed auto-capture tuning
/// (see `ScanMode::auto_capture_config`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// A4 / Letter pages.
    #[default]
    Document,
    /// Long narrow till receipts; tolerates a lower score.
    Receipt,
    /// Small rigid cards held close; short hold.
    IdCard,
    /// Bound pages that curve near the spine; longer hold.
    Book,
}
