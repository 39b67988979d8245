// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-capture controller — hysteresis and debounce over per-frame quality.
//
// A single good frame never triggers a capture. Quality must stay qualifying
// for the whole hold duration, and two automatic captures are always at least
// `min_capture_interval_ms` apart. Any dip restarts the hold from zero.

use std::collections::VecDeque;

use scanwerk_core::{AutoCaptureConfig, AutoCaptureConfigUpdate, QualityLevel, TimestampMs};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::quality::QualityScore;

/// How far back overall scores are kept for the UI queries.
const QUALITY_HISTORY_MS: u64 = 5000;
/// Hard cap on kept overall scores.
const QUALITY_HISTORY_CAPACITY: usize = 300;

/// Per-frame auto-capture output for progress UI and the capture trigger.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCaptureState {
    /// The hold duration has been satisfied by the current streak.
    pub is_ready: bool,
    /// Fraction of the hold elapsed, 0.0-1.0.
    pub progress: f64,
    /// Milliseconds of hold still required.
    pub time_remaining_ms: u64,
    /// Take the photo now. True on exactly one frame per completed hold.
    pub should_capture: bool,
}

impl AutoCaptureState {
    /// Short overlay text for the current state, if any.
    pub fn status_message(&self) -> Option<String> {
        if self.should_capture {
            Some("Capturing...".into())
        } else if self.is_ready {
            Some("Almost there, keep holding.".into())
        } else if self.progress > 0.0 {
            Some(format!(
                "Hold still... {:.1}s",
                self.time_remaining_ms as f64 / 1000.0
            ))
        } else {
            None
        }
    }
}

/// Conceptual controller phase, for logs and UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// No qualifying streak.
    Idle,
    /// Qualifying since `ready_since`.
    Accumulating,
}

/// Hysteresis state machine deciding when to auto-capture.
///
/// Owns the only mutable session state in the decision path: the start of
/// the current qualifying streak and the time of the last capture. Create one
/// per camera session.
#[derive(Debug, Clone)]
pub struct AutoCaptureController {
    config: AutoCaptureConfig,
    /// Start of the current qualifying streak.
    ready_since: Option<TimestampMs>,
    /// When the last automatic capture fired.
    last_capture: Option<TimestampMs>,
    /// `(timestamp, overall)` for every evaluated frame, oldest first.
    quality_history: VecDeque<(TimestampMs, u8)>,
}

impl Default for AutoCaptureController {
    fn default() -> Self {
        Self::new(AutoCaptureConfig::default())
    }
}

impl AutoCaptureController {
    pub fn new(config: AutoCaptureConfig) -> Self {
        Self {
            config,
            ready_since: None,
            last_capture: None,
            quality_history: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &AutoCaptureConfig {
        &self.config
    }

    /// Replace the whole config. Session state is kept.
    pub fn set_config(&mut self, config: AutoCaptureConfig) {
        debug!(?config, "auto-capture config replaced");
        self.config = config;
    }

    /// Merge a partial update into the current config.
    pub fn update_config(&mut self, update: &AutoCaptureConfigUpdate) {
        self.set_config(self.config.merge(update));
    }

    /// Feed one frame's quality and decide.
    ///
    /// When disabled the result is always the zero state, and the streak and
    /// debounce timestamps are left untouched, so re-enabling resumes where
    /// the controller left off.
    ///
    /// A timestamp earlier than any the controller has seen is treated as a
    /// host clock restart: streak, debounce and quality history are cleared.
    pub fn evaluate(&mut self, score: &QualityScore, now: TimestampMs) -> AutoCaptureState {
        if self.is_before_known_time(now) {
            warn!(
                at = now,
                last_capture = self.last_capture,
                "frame clock went backwards; capture timing reset"
            );
            self.reset();
        }
        self.record_quality(score.overall, now);

        if !self.config.enabled {
            return AutoCaptureState::default();
        }

        let qualifying =
            score.overall >= self.config.min_quality_score && score.level == QualityLevel::Good;

        if !qualifying {
            if let Some(since) = self.ready_since.take() {
                debug!(
                    overall = score.overall,
                    held_ms = now.saturating_sub(since),
                    "qualifying streak broken"
                );
            }
            return AutoCaptureState::default();
        }

        let since = *self.ready_since.get_or_insert_with(|| {
            debug!(overall = score.overall, at = now, "qualifying streak started");
            now
        });

        let hold = self.config.hold_duration_ms;
        let elapsed = now.saturating_sub(since);
        let progress = if hold == 0 {
            1.0
        } else {
            (elapsed as f64 / hold as f64).min(1.0)
        };
        let hold_complete = elapsed >= hold;

        if !hold_complete {
            return AutoCaptureState {
                is_ready: false,
                progress,
                time_remaining_ms: hold - elapsed,
                should_capture: false,
            };
        }

        let interval = self.config.min_capture_interval_ms;
        let cooled_down = self
            .last_capture
            .is_none_or(|last| now.saturating_sub(last) >= interval);

        if !cooled_down {
            debug!(
                since_last_ms = self.last_capture.map(|last| now.saturating_sub(last)),
                interval, "capture suppressed by debounce"
            );
            return AutoCaptureState {
                is_ready: true,
                progress: 1.0,
                time_remaining_ms: 0,
                should_capture: false,
            };
        }

        info!(overall = score.overall, held_ms = elapsed, "auto-capture fired");
        self.ready_since = None;
        self.last_capture = Some(now);

        AutoCaptureState {
            is_ready: true,
            progress: 1.0,
            time_remaining_ms: 0,
            should_capture: true,
        }
    }

    /// A qualifying streak is underway.
    pub fn is_in_progress(&self) -> bool {
        self.ready_since.is_some()
    }

    pub fn phase(&self) -> CapturePhase {
        if self.is_in_progress() {
            CapturePhase::Accumulating
        } else {
            CapturePhase::Idle
        }
    }

    /// When the last automatic capture fired.
    pub fn last_capture(&self) -> Option<TimestampMs> {
        self.last_capture
    }

    /// Mean overall score over the trailing `window_ms` (0 with no data).
    pub fn average_quality(&self, window_ms: u64) -> f64 {
        let scores: Vec<f64> = self.recent_scores(window_ms).collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// Population variance of the trailing scores is below `max_variance`.
    /// Needs at least three scores in the window.
    pub fn is_quality_stable(&self, window_ms: u64, max_variance: f64) -> bool {
        let scores: Vec<f64> = self.recent_scores(window_ms).collect();
        if scores.len() < 3 {
            return false;
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        variance < max_variance
    }

    /// Back to the initial state: no streak, no debounce, no history.
    pub fn reset(&mut self) {
        self.ready_since = None;
        self.last_capture = None;
        self.quality_history.clear();
    }

    fn is_before_known_time(&self, now: TimestampMs) -> bool {
        let newest = self.quality_history.back().map(|(t, _)| *t);
        [self.ready_since, self.last_capture, newest]
            .into_iter()
            .flatten()
            .any(|t| now < t)
    }

    fn record_quality(&mut self, overall: u8, now: TimestampMs) {
        self.quality_history.push_back((now, overall));
        while self
            .quality_history
            .front()
            .is_some_and(|(t, _)| now.saturating_sub(*t) > QUALITY_HISTORY_MS)
        {
            self.quality_history.pop_front();
        }
        while self.quality_history.len() > QUALITY_HISTORY_CAPACITY {
            self.quality_history.pop_front();
        }
    }

    fn recent_scores(&self, window_ms: u64) -> impl Iterator<Item = f64> + '_ {
        let newest = self.quality_history.back().map_or(0, |(t, _)| *t);
        self.quality_history
            .iter()
            .filter(move |(t, _)| newest.saturating_sub(*t) <= window_ms)
            .map(|(_, overall)| *overall as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(overall: u8) -> QualityScore {
        let level = QualityLevel::from_overall(overall);
        QualityScore {
            overall,
            level,
            color: level.color(),
            ..QualityScore::no_detection()
        }
    }

    /// Feed `overall` every 50 ms over `[from, to)`; return timestamps that fired.
    fn feed(ctrl: &mut AutoCaptureController, overall: u8, from: u64, to: u64) -> Vec<u64> {
        (from..to)
            .step_by(50)
            .filter(|&t| ctrl.evaluate(&score(overall), t).should_capture)
            .collect()
    }

    #[test]
    fn single_good_frame_does_not_fire() {
        let mut ctrl = AutoCaptureController::default();
        let state = ctrl.evaluate(&score(95), 0);
        assert!(!state.should_capture);
        assert!(!state.is_ready);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.time_remaining_ms, 1500);
        assert!(ctrl.is_in_progress());
        assert_eq!(ctrl.phase(), CapturePhase::Accumulating);
    }

    #[test]
    fn progress_tracks_hold() {
        let mut ctrl = AutoCaptureController::default();
        ctrl.evaluate(&score(90), 1000);
        let state = ctrl.evaluate(&score(90), 1750);
        assert!((state.progress - 0.5).abs() < 1e-9);
        assert_eq!(state.time_remaining_ms, 750);
    }

    #[test]
    fn fires_once_after_hold_then_requires_new_hold() {
        let mut ctrl = AutoCaptureController::default();
        assert_eq!(feed(&mut ctrl, 90, 0, 1550), vec![1500]);
        assert!(!ctrl.is_in_progress());

        // Next qualifying frame starts a fresh streak.
        let next = ctrl.evaluate(&score(90), 1550);
        assert!(!next.is_ready);
        assert!(!next.should_capture);
        assert_eq!(next.progress, 0.0);

        ctrl.evaluate(&score(0), 1600);
        assert!(!ctrl.is_in_progress());
    }

    #[test]
    fn dip_restarts_hold() {
        let mut ctrl = AutoCaptureController::default();
        assert!(feed(&mut ctrl, 90, 0, 1000).is_empty());
        ctrl.evaluate(&score(50), 1000);
        assert!(!ctrl.is_in_progress());
        // Needs a full 1500 ms again from t=1050.
        assert_eq!(feed(&mut ctrl, 90, 1050, 2600), vec![2550]);
    }

    #[test]
    fn below_threshold_but_good_does_not_qualify() {
        let mut ctrl = AutoCaptureController::default();
        // 75 is "good" but under the default 80 threshold.
        assert!(feed(&mut ctrl, 75, 0, 3000).is_empty());
        assert!(!ctrl.is_in_progress());
    }

    #[test]
    fn level_must_be_good_even_with_low_threshold() {
        let mut ctrl = AutoCaptureController::new(AutoCaptureConfig {
            min_quality_score: 10,
            ..Default::default()
        });
        assert!(feed(&mut ctrl, 60, 0, 3000).is_empty());
    }

    #[test]
    fn debounce_suppresses_close_second_streak() {
        let mut ctrl = AutoCaptureController::default();
        assert_eq!(feed(&mut ctrl, 90, 0, 1550), vec![1500]);
        ctrl.evaluate(&score(0), 1550);

        // Second hold completes at 3100, only 1600 ms after the first capture.
        assert!(feed(&mut ctrl, 90, 1600, 3250).is_empty());
        let held = ctrl.evaluate(&score(90), 3250);
        assert!(held.is_ready);
        assert!(!held.should_capture);
        ctrl.evaluate(&score(0), 3300);

        assert_eq!(ctrl.last_capture(), Some(1500));
    }

    #[test]
    fn debounced_streak_fires_when_interval_elapses() {
        let mut ctrl = AutoCaptureController::default();
        assert_eq!(feed(&mut ctrl, 90, 0, 1550), vec![1500]);
        ctrl.evaluate(&score(0), 1550);
        assert_eq!(feed(&mut ctrl, 90, 1600, 4000), vec![3500]);
    }

    #[test]
    fn disabled_returns_zero_state_and_preserves_session() {
        let mut ctrl = AutoCaptureController::default();
        feed(&mut ctrl, 90, 0, 1000);
        assert!(ctrl.is_in_progress());

        ctrl.update_config(&AutoCaptureConfigUpdate {
            enabled: Some(false),
            ..Default::default()
        });
        let state = ctrl.evaluate(&score(90), 1600);
        assert_eq!(state, AutoCaptureState::default());
        assert!(ctrl.is_in_progress(), "streak survives while disabled");

        ctrl.update_config(&AutoCaptureConfigUpdate {
            enabled: Some(true),
            ..Default::default()
        });
        // Resumes the streak that began at t=0.
        assert!(ctrl.evaluate(&score(90), 1650).should_capture);
    }

    #[test]
    fn zero_hold_fires_immediately() {
        let mut ctrl = AutoCaptureController::new(AutoCaptureConfig {
            hold_duration_ms: 0,
            ..Default::default()
        });
        let state = ctrl.evaluate(&score(90), 10);
        assert!(state.should_capture);
        assert_eq!(state.progress, 1.0);
    }

    #[test]
    fn average_and_variance_queries() {
        let mut ctrl = AutoCaptureController::default();
        assert_eq!(ctrl.average_quality(1000), 0.0);
        ctrl.evaluate(&score(80), 0);
        ctrl.evaluate(&score(82), 100);
        assert!(!ctrl.is_quality_stable(1000, 100.0), "needs three scores");
        ctrl.evaluate(&score(84), 200);
        assert!((ctrl.average_quality(1000) - 82.0).abs() < 1e-9);
        // Variance of {80, 82, 84} is 8/3.
        assert!(ctrl.is_quality_stable(1000, 3.0));
        assert!(!ctrl.is_quality_stable(1000, 2.0));
        // Only the newest two are within 100 ms.
        assert!((ctrl.average_quality(100) - 83.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_everything() {
        let mut ctrl = AutoCaptureController::default();
        feed(&mut ctrl, 90, 0, 1550);
        ctrl.evaluate(&score(90), 1600);
        ctrl.reset();
        assert!(!ctrl.is_in_progress());
        assert_eq!(ctrl.last_capture(), None);
        assert_eq!(ctrl.average_quality(10_000), 0.0);
    }

    #[test]
    fn clock_restart_clears_debounce() {
        let mut ctrl = AutoCaptureController::default();
        assert_eq!(feed(&mut ctrl, 90, 10_000, 11_700), vec![11_500]);

        // Host clock restarts from zero; a full hold must fire again.
        assert_eq!(feed(&mut ctrl, 90, 0, 1550), vec![1500]);
        assert_eq!(ctrl.last_capture(), Some(1500));
    }

    #[test]
    fn clock_restart_mid_hold_starts_a_fresh_streak() {
        let mut ctrl = AutoCaptureController::default();
        feed(&mut ctrl, 90, 5000, 6000);
        assert!(ctrl.is_in_progress());

        let state = ctrl.evaluate(&score(90), 100);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.time_remaining_ms, 1500);
        assert_eq!(ctrl.average_quality(10_000), 90.0);
    }

    #[test]
    fn repeated_timestamp_is_not_a_restart() {
        let mut ctrl = AutoCaptureController::default();
        feed(&mut ctrl, 90, 0, 1000);
        let state = ctrl.evaluate(&score(90), 950);
        assert!(state.progress > 0.6);
    }

    #[test]
    fn status_messages() {
        assert_eq!(AutoCaptureState::default().status_message(), None);
        let holding = AutoCaptureState {
            is_ready: false,
            progress: 0.5,
            time_remaining_ms: 700,
            should_capture: false,
        };
        assert_eq!(holding.status_message().as_deref(), Some("Hold still... 0.7s"));
    }
}
