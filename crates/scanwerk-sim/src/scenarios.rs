// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic corner streams, standing in for a live detector.

use clap::ValueEnum;
use scanwerk_core::{FrameSize, Point, Quad};

/// A canned camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Document held perfectly still at a 10% inset.
    Steady,
    /// Still document with a few pixels of hand tremor.
    Jittery,
    /// Document slides in from the edge, then settles.
    WalkIn,
    /// Steady document with the detector dropping out mid-hold.
    Dropout,
    /// Hands moving the document too much to ever capture.
    Shaky,
    /// Steady, then the document is swapped for a second page.
    TwoPages,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::Steady,
        Scenario::Jittery,
        Scenario::WalkIn,
        Scenario::Dropout,
        Scenario::Shaky,
        Scenario::TwoPages,
    ];

    /// Detector output for `frames` consecutive frames.
    pub fn corners(self, frame: FrameSize, frames: usize) -> Vec<Option<Quad>> {
        (0..frames).map(|i| self.corners_at(frame, i)).collect()
    }

    fn corners_at(self, frame: FrameSize, i: usize) -> Option<Quad> {
        let base = inset_rect(frame, 0.10);
        match self {
            Scenario::Steady => Some(base),
            Scenario::Jittery => Some(shift(base, tremor(i, 3.0), tremor(i + 7, 3.0))),
            Scenario::WalkIn => {
                let remaining = 30usize.saturating_sub(i) as f64;
                Some(shift(base, remaining * frame.width as f64 * 0.01, 0.0))
            }
            Scenario::Dropout => (!(20..24).contains(&i)).then_some(base),
            Scenario::Shaky => Some(shift(base, tremor(i, 25.0), tremor(i + 3, 25.0))),
            Scenario::TwoPages => match i {
                40..46 => None,
                46.. => Some(inset_rect(frame, 0.12)),
                _ => Some(base),
            },
        }
    }
}

fn inset_rect(frame: FrameSize, inset: f64) -> Quad {
    let (w, h) = (frame.width as f64, frame.height as f64);
    Quad::from_rect(w * inset, h * inset, w * (1.0 - inset), h * (1.0 - inset))
}

fn shift(quad: Quad, dx: f64, dy: f64) -> Quad {
    quad.map(|p| Point::new(p.x + dx, p.y + dy))
}

/// Deterministic pseudo-random offset in `[-amplitude, amplitude]`.
fn tremor(i: usize, amplitude: f64) -> f64 {
    let h = (i as u64).wrapping_mul(2_654_435_761) % 1000;
    (h as f64 / 999.0 * 2.0 - 1.0) * amplitude
}
