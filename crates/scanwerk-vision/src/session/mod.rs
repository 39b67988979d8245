// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session — the per-frame pipeline.
//
// corner sample → history → quality score → auto-capture decision → event.
// One session per camera session; one frame in flight at a time.

pub mod clock;
pub mod events;

use chrono::Utc;
use scanwerk_core::{
    AutoCaptureConfigUpdate, FrameSize, Quad, ScanMode, SessionConfig, SessionId, TimestampMs,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::capture::{AutoCaptureController, AutoCaptureState};
use crate::crop::{self, CropResult};
use crate::quality::{self, QualityScore};
use crate::stability::StabilityTracker;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{CaptureEvent, CaptureTrigger, EventSink, FnSink, NullSink, ScanEvent};

/// One frame's worth of detector output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInput {
    /// Ordered outline, or `None` when the detector found nothing.
    pub quad: Option<Quad>,
    pub frame: FrameSize,
    pub timestamp_ms: TimestampMs,
    /// Detector-reported confidence (0.0-1.0), overriding the geometric one.
    pub detector_confidence: Option<f64>,
}

impl FrameInput {
    pub fn new(quad: Option<Quad>, frame: FrameSize, timestamp_ms: TimestampMs) -> Self {
        Self {
            quad,
            frame,
            timestamp_ms,
            detector_confidence: None,
        }
    }

    pub fn with_detector_confidence(mut self, confidence: f64) -> Self {
        self.detector_confidence = Some(confidence);
        self
    }
}

/// What the host gets back for every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub timestamp_ms: TimestampMs,
    pub score: QualityScore,
    pub auto_capture: AutoCaptureState,
    /// The outline would be accepted as a crop as-is.
    pub corners_valid: bool,
}

/// Owns the stability history and auto-capture controller for one camera
/// session, and routes capture decisions to an [`EventSink`].
pub struct ScanSession {
    id: SessionId,
    config: SessionConfig,
    history: StabilityTracker,
    controller: AutoCaptureController,
    /// Overall score of the most recent frame.
    last_overall: Option<u8>,
    sink: Box<dyn EventSink>,
    clock: Box<dyn Clock>,
}

impl ScanSession {
    // -- Construction ---------------------------------------------------------

    /// New session with no event sink and a monotonic clock.
    pub fn new(config: SessionConfig) -> Self {
        let id = SessionId::new();
        info!(session = %id, mode = ?config.mode, "scan session created");
        Self {
            id,
            history: StabilityTracker::new(config.stability),
            controller: AutoCaptureController::new(config.auto_capture),
            last_overall: None,
            config,
            sink: Box::new(NullSink),
            clock: Box::new(MonotonicClock::new()),
        }
    }

    /// Preset session for a scan mode.
    pub fn for_mode(mode: ScanMode) -> Self {
        Self::new(SessionConfig::for_mode(mode))
    }

    /// Route capture events to `sink`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Stamp [`ScanSession::process_frame_now`] frames from `clock`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn controller(&self) -> &AutoCaptureController {
        &self.controller
    }

    pub fn history(&self) -> &StabilityTracker {
        &self.history
    }

    // -- Frame path -----------------------------------------------------------

    /// Score one frame and decide whether to auto-capture.
    ///
    /// A missing or non-finite outline scores as "no detection": it breaks
    /// any qualifying streak and is not added to the stability history.
    pub fn process_frame(&mut self, input: FrameInput) -> FrameReport {
        let now = input.timestamp_ms;

        let Some(quad) = input.quad.filter(Quad::is_finite) else {
            if input.quad.is_some() {
                warn!(session = %self.id, "non-finite corners dropped");
            }
            let score = QualityScore::no_detection();
            self.last_overall = Some(score.overall);
            let auto_capture = self.controller.evaluate(&score, now);
            return FrameReport {
                timestamp_ms: now,
                score,
                auto_capture,
                corners_valid: false,
            };
        };

        self.history.add(quad, now);
        let score = quality::score_frame(&quad, input.frame, &self.history, input.detector_confidence);
        self.last_overall = Some(score.overall);
        let auto_capture = self.controller.evaluate(&score, now);
        let corners_valid = crop::validate(&quad, input.frame);

        if auto_capture.should_capture {
            let crop = crop::resolve_capture(
                Some(&quad),
                input.frame,
                self.config.mode.fallback_inset(),
                score.overall as f64 / 100.0,
            );
            self.emit_capture(CaptureTrigger::Auto, crop, score.overall, now);
        }

        FrameReport {
            timestamp_ms: now,
            score,
            auto_capture,
            corners_valid,
        }
    }

    /// [`ScanSession::process_frame`] stamped with the session clock.
    pub fn process_frame_now(
        &mut self,
        quad: Option<Quad>,
        frame: FrameSize,
        detector_confidence: Option<f64>,
    ) -> FrameReport {
        let input = FrameInput {
            quad,
            frame,
            timestamp_ms: self.clock.now_ms(),
            detector_confidence,
        };
        self.process_frame(input)
    }

    /// Shutter pressed. Resolves corners (falling back if they are unusable),
    /// emits a manual capture event, and returns the crop.
    ///
    /// Does not reset the auto-capture debounce.
    #[instrument(skip(self, quad), fields(session = %self.id))]
    pub fn manual_capture(&mut self, quad: Option<Quad>, frame: FrameSize) -> CropResult {
        let now = self.clock.now_ms();
        let overall = self.last_overall.unwrap_or(0);
        let confidence = match quad {
            Some(_) if overall > 0 => overall as f64 / 100.0,
            _ => crop::FALLBACK_CONFIDENCE,
        };
        let crop = crop::resolve_capture(quad.as_ref(), frame, self.config.mode.fallback_inset(), confidence);
        self.emit_capture(CaptureTrigger::Manual, crop, overall, now);
        crop
    }

    // -- Session control ------------------------------------------------------

    /// Forget history and streak/debounce state.
    pub fn reset(&mut self) {
        debug!(session = %self.id, "scan session reset");
        self.history.clear();
        self.controller.reset();
        self.last_overall = None;
    }

    /// Merge a partial auto-capture update.
    pub fn update_auto_capture(&mut self, update: &AutoCaptureConfigUpdate) {
        self.controller.update_config(update);
        self.config.auto_capture = *self.controller.config();
    }

    /// Switch to another scan-mode preset. History and session timing are
    /// kept; only the tuning changes.
    pub fn set_mode(&mut self, mode: ScanMode) {
        info!(session = %self.id, from = ?self.config.mode, to = ?mode, "scan mode changed");
        self.config.mode = mode;
        self.config.auto_capture = mode.auto_capture_config();
        self.controller.set_config(self.config.auto_capture);
    }

    fn emit_capture(&mut self, trigger: CaptureTrigger, crop: CropResult, overall: u8, now: TimestampMs) {
        info!(
            session = %self.id,
            ?trigger,
            fallback = crop.used_fallback,
            width = crop.size.width,
            height = crop.size.height,
            "capture requested"
        );
        self.sink.emit(ScanEvent::Capture(CaptureEvent {
            session_id: self.id,
            trigger,
            crop,
            overall,
            vibrate: self.config.auto_capture.vibrate_feedback,
            timestamp_ms: now,
            emitted_at: Utc::now(),
        }));
    }
}
