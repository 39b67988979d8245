// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-vision — the decision core of the Scanwerk document camera.
//
// Takes the four corners a detector reports for each preview frame and
// decides how good the framing is, whether the document is being held still,
// when to take the photo automatically, and which corners to crop with.
// Pixel work (edge detection, perspective warp, encoding) stays with the host.

pub mod capture;
pub mod crop;
pub mod geometry;
pub mod quality;
pub mod session;
pub mod stability;

// Re-export the primary types so callers can use `scanwerk_vision::ScanSession` etc.
pub use capture::{AutoCaptureController, AutoCaptureState, CapturePhase};
pub use crop::{CropResult, OutputSize, QuadRejection};
pub use quality::{QualityScore, score_frame};
pub use session::{
    CaptureEvent, CaptureTrigger, Clock, EventSink, FnSink, FrameInput, FrameReport, ManualClock,
    MonotonicClock, NullSink, ScanEvent, ScanSession,
};
pub use stability::StabilityTracker;
