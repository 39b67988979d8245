// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end checks of the frame pipeline: corners in, capture events out.

use std::sync::mpsc;

use scanwerk_core::{FrameSize, Point, Quad, QualityLevel, Recommendation, SessionConfig};
use scanwerk_vision::crop;
use scanwerk_vision::{CaptureTrigger, FrameInput, FrameReport, ScanEvent, ScanSession};

const FRAME: FrameSize = FrameSize::new(1000, 1000);
const STEP_MS: u64 = 50;

/// Document at a 10% inset on every side (area ratio 0.64).
fn still_document() -> Quad {
    Quad::from_rect(100.0, 100.0, 900.0, 900.0)
}

fn run(
    session: &mut ScanSession,
    quads: impl IntoIterator<Item = Option<Quad>>,
    start: u64,
) -> Vec<FrameReport> {
    quads
        .into_iter()
        .enumerate()
        .map(|(i, quad)| session.process_frame(FrameInput::new(quad, FRAME, start + i as u64 * STEP_MS)))
        .collect()
}

fn fired(reports: &[FrameReport]) -> Vec<u64> {
    reports
        .iter()
        .filter(|r| r.auto_capture.should_capture)
        .map(|r| r.timestamp_ms)
        .collect()
}

#[test]
fn still_document_scores_perfect_and_fires_once_after_hold() {
    let (tx, rx) = mpsc::channel::<ScanEvent>();
    let mut session = ScanSession::new(SessionConfig::default()).with_sink(tx);
    let reports = run(&mut session, std::iter::repeat_n(Some(still_document()), 40), 0);

    // Stability ramps while the window fills, then everything is maxed out.
    let stability: Vec<f64> = reports.iter().take(5).map(|r| r.score.stability).collect();
    assert_eq!(stability, vec![10.0, 20.0, 30.0, 40.0, 100.0]);

    let steady = &reports[19].score;
    assert_eq!(steady.fill, 100.0);
    assert_eq!(steady.stability, 100.0);
    assert_eq!(steady.sharpness, 100.0);
    assert_eq!(steady.confidence, 100.0);
    assert_eq!(steady.overall, 100);
    assert_eq!(steady.level, QualityLevel::Good);
    assert_eq!(steady.recommendation, Recommendation::ReadyToCapture);
    assert!(reports.iter().all(|r| r.corners_valid));

    // Frame 3 is the first at or above 80, so the 1500 ms hold ends at 1650.
    assert_eq!(reports[3].score.overall, 82);
    assert_eq!(fired(&reports), vec![1650]);

    let ScanEvent::Capture(event) = rx.try_recv().expect("one capture event");
    assert_eq!(event.trigger, CaptureTrigger::Auto);
    assert_eq!(event.overall, 100);
    assert_eq!(event.crop.corners, still_document());
    assert_eq!(event.crop.size, crop::OutputSize { width: 800, height: 800 });
    assert!(rx.try_recv().is_err());
}

#[test]
fn progress_rises_monotonically_during_hold() {
    let mut session = ScanSession::new(SessionConfig::default());
    let reports = run(&mut session, std::iter::repeat_n(Some(still_document()), 33), 0);
    let progress: Vec<f64> = reports[3..].iter().map(|r| r.auto_capture.progress).collect();
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(reports[32].auto_capture.time_remaining_ms, 50);
    assert!(reports.iter().all(|r| !r.auto_capture.is_ready));
}

#[test]
fn no_second_capture_without_a_new_hold() {
    let mut session = ScanSession::new(SessionConfig::default());
    let reports = run(&mut session, std::iter::repeat_n(Some(still_document()), 35), 0);
    assert_eq!(fired(&reports), vec![1650]);

    // The frame after the capture starts a fresh streak.
    let next = &reports[34];
    assert!(!next.auto_capture.is_ready);
    assert!(!next.auto_capture.should_capture);
    assert!(session.controller().is_in_progress());
}

#[test]
fn lost_document_breaks_the_hold() {
    let mut session = ScanSession::new(SessionConfig::default());
    let mut quads: Vec<Option<Quad>> = vec![Some(still_document()); 20];
    quads.push(None);
    quads.extend(std::iter::repeat_n(Some(still_document()), 32));

    let reports = run(&mut session, quads, 0);
    let lost = &reports[20];
    assert_eq!(lost.score.overall, 0);
    assert_eq!(lost.score.recommendation, Recommendation::PositionDocument);

    // Stability history survives the dropout, so the streak restarts at
    // t=1050 and the hold completes at 2550.
    assert_eq!(fired(&reports), vec![2550]);
}

#[test]
fn second_streak_inside_interval_is_suppressed() {
    let (tx, rx) = mpsc::channel::<ScanEvent>();
    let mut session = ScanSession::new(SessionConfig::default()).with_sink(tx);

    // First hold fires at 1650, then the document is lost for one frame.
    let mut quads: Vec<Option<Quad>> = vec![Some(still_document()); 34];
    quads.push(None);
    // A second hold from 1750 completes at 3250, 1600 ms after the first capture.
    quads.extend(std::iter::repeat_n(Some(still_document()), 32));
    quads.push(None);

    let reports = run(&mut session, quads, 0);
    assert_eq!(fired(&reports), vec![1650]);
    let held = reports.iter().find(|r| r.timestamp_ms == 3250).expect("frame at 3250");
    assert!(held.auto_capture.is_ready);
    assert!(!held.auto_capture.should_capture);

    assert_eq!(rx.try_iter().count(), 1);
}

#[test]
fn shaky_hands_never_fire() {
    let mut session = ScanSession::new(SessionConfig::default());
    // 40 px swings between frames keep stability at the bottom tier.
    let quads = (0..80).map(|i| {
        let dx = if i % 2 == 0 { 0.0 } else { 40.0 };
        Some(Quad::from_rect(100.0 + dx, 100.0, 860.0 + dx, 900.0))
    });
    let reports = run(&mut session, quads, 0);
    assert!(fired(&reports).is_empty());
    let last = &reports[79].score;
    assert_eq!(last.stability, 20.0);
    assert_eq!(last.overall, 76);
    assert!(!session.controller().is_in_progress());
}

#[test]
fn skewed_document_is_scored_but_still_croppable() {
    let mut session = ScanSession::new(SessionConfig::default());
    // Strong keystone: ~16 degrees off square at every corner.
    let skewed = Quad::new(
        Point::new(300.0, 150.0),
        Point::new(700.0, 150.0),
        Point::new(900.0, 850.0),
        Point::new(100.0, 850.0),
    );
    let report = session.process_frame(FrameInput::new(Some(skewed), FRAME, 0));
    assert!(report.corners_valid);
    assert_eq!(report.score.sharpness, 60.0);
    assert_eq!(report.score.confidence, 20.0);
    assert_ne!(report.score.level, QualityLevel::Good);

    let result = session.manual_capture(Some(skewed), FRAME);
    assert!(!result.used_fallback);
    assert_eq!(result.corners, skewed);
    assert_eq!(result.size, crop::OutputSize { width: 800, height: 728 });
    assert!((result.confidence - 0.34).abs() < 1e-9);
}

#[test]
fn host_clock_restart_does_not_block_captures() {
    let (tx, rx) = mpsc::channel::<ScanEvent>();
    let mut session = ScanSession::new(SessionConfig::default()).with_sink(tx);

    let before = run(&mut session, std::iter::repeat_n(Some(still_document()), 40), 10_000);
    assert_eq!(fired(&before), vec![11_650]);

    // Camera restarted and the host clock is back at zero.
    let after = run(&mut session, std::iter::repeat_n(Some(still_document()), 40), 0);
    assert_eq!(fired(&after), vec![1650]);
    assert_eq!(after[4].score.stability, 100.0);
    assert_eq!(after[0].score.stability, 10.0);

    assert_eq!(rx.try_iter().count(), 2);
}
