// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry kernel — distances, interior angles, shoelace area, and shape
// checks on four-corner document outlines.
//
// Every function is total: degenerate input (zero-length edges, collinear or
// non-finite corners) yields a sentinel (0 for lengths/angles/areas, `false`
// for shape checks) instead of NaN.

use scanwerk_core::{Point, Quad};

/// Opposite sides must be within this ratio of each other for
/// [`is_rectangular_quad`].
pub const RECTANGULAR_SIDE_RATIO: f64 = 0.8;

/// Euclidean distance between two points. Non-finite input yields 0.
pub fn distance(a: Point, b: Point) -> f64 {
    let d = (a.x - b.x).hypot(a.y - b.y);
    if d.is_finite() { d } else { 0.0 }
}

/// Angle at `vertex` between the rays to `prev` and `next`, in degrees
/// (0..=180).
///
/// The cosine is clamped to [-1, 1] before `acos` so floating-point drift on
/// near-straight angles cannot produce NaN. A zero-length ray yields 0.
pub fn angle_at(prev: Point, vertex: Point, next: Point) -> f64 {
    let (ax, ay) = (prev.x - vertex.x, prev.y - vertex.y);
    let (bx, by) = (next.x - vertex.x, next.y - vertex.y);
    let len_a = ax.hypot(ay);
    let len_b = bx.hypot(by);
    if !(len_a > 0.0 && len_b > 0.0) || !len_a.is_finite() || !len_b.is_finite() {
        return 0.0;
    }
    let cos = ((ax * bx + ay * by) / (len_a * len_b)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Interior angles at `[tl, tr, br, bl]`.
pub fn interior_angles(quad: &Quad) -> [f64; 4] {
    let p = quad.points();
    std::array::from_fn(|i| angle_at(p[(i + 3) % 4], p[i], p[(i + 1) % 4]))
}

/// Mean absolute deviation of the four interior angles from 90°.
pub fn mean_right_angle_deviation(quad: &Quad) -> f64 {
    interior_angles(quad)
        .iter()
        .map(|angle| (angle - 90.0).abs())
        .sum::<f64>()
        / 4.0
}

/// Signed area via the shoelace formula. Positive when the corners wind
/// counter-clockwise in a y-up frame (clockwise on screen).
pub fn signed_area(quad: &Quad) -> f64 {
    let p = quad.points();
    let mut twice = 0.0;
    for i in 0..4 {
        let j = (i + 1) % 4;
        twice += p[i].x * p[j].y - p[j].x * p[i].y;
    }
    let area = twice / 2.0;
    if area.is_finite() { area } else { 0.0 }
}

/// Unsigned area of the quad.
pub fn area(quad: &Quad) -> f64 {
    signed_area(quad).abs()
}

/// Side lengths `[top, right, bottom, left]`.
pub fn edge_lengths(quad: &Quad) -> [f64; 4] {
    [
        distance(quad.top_left, quad.top_right),
        distance(quad.top_right, quad.bottom_right),
        distance(quad.bottom_left, quad.bottom_right),
        distance(quad.top_left, quad.bottom_left),
    ]
}

/// Strict convexity test.
///
/// The cross product of consecutive edges must have the same strict sign at
/// all four vertices. A zero cross product (repeated corner, collinear run)
/// counts as a mismatch, so degenerate outlines are never convex.
pub fn is_convex_quad(quad: &Quad) -> bool {
    if !quad.is_finite() {
        return false;
    }
    let p = quad.points();
    let mut positive = 0;
    let mut negative = 0;
    for i in 0..4 {
        let (a, b, c) = (p[i], p[(i + 1) % 4], p[(i + 2) % 4]);
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross > 0.0 {
            positive += 1;
        } else if cross < 0.0 {
            negative += 1;
        }
    }
    positive == 4 || negative == 4
}

/// Loose "looks like a photographed rectangle" heuristic.
///
/// Opposite sides are compared pairwise; both the width pair and the height
/// pair must satisfy `min / max >= 0.8`. This tolerates perspective skew and
/// is used for confidence scoring, not as a geometric proof.
pub fn is_rectangular_quad(quad: &Quad) -> bool {
    let [top, right, bottom, left] = edge_lengths(quad);
    side_ratio(top, bottom) >= RECTANGULAR_SIDE_RATIO
        && side_ratio(left, right) >= RECTANGULAR_SIDE_RATIO
}

fn side_ratio(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max > 0.0 { a.min(b) / max } else { 0.0 }
}

/// Largest distance any corner moved between two outlines.
pub fn max_corner_displacement(a: &Quad, b: &Quad) -> f64 {
    a.points()
        .iter()
        .zip(b.points().iter())
        .map(|(p, q)| distance(*p, *q))
        .fold(0.0, f64::max)
}
