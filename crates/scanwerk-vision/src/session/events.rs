// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Events leaving the capture core, and the sinks that carry them to the host.
//
// Events flow one way. A host that processes frames off the UI thread hands
// the session an `mpsc::Sender` and reads captures on the other side; the
// core never touches host state directly.

use std::sync::mpsc;

use chrono::{DateTime, Utc};
use scanwerk_core::{SessionId, TimestampMs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crop::CropResult;

/// What caused a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureTrigger {
    /// The auto-capture controller completed a hold.
    Auto,
    /// The user pressed the shutter.
    Manual,
}

/// Instruction to the host to take the photo and crop it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureEvent {
    pub session_id: SessionId,
    pub trigger: CaptureTrigger,
    pub crop: CropResult,
    /// Composite score of the triggering frame (0 for manual captures with
    /// no scored frame).
    pub overall: u8,
    /// Host haptics should fire.
    pub vibrate: bool,
    /// Frame timestamp the decision was made on.
    pub timestamp_ms: TimestampMs,
    /// Wall-clock time the event was emitted, for page metadata.
    pub emitted_at: DateTime<Utc>,
}

/// Everything a session can emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Capture(CaptureEvent),
}

/// Receiver of session events. Implementations must not block the frame path.
pub trait EventSink: Send {
    fn emit(&mut self, event: ScanEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: ScanEvent) {}
}

impl EventSink for mpsc::Sender<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        if self.send(event).is_err() {
            debug!("event receiver dropped; event discarded");
        }
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: FnMut(ScanEvent) + Send,
{
    fn emit(&mut self, event: ScanEvent) {
        (self.0)(event)
    }
}
