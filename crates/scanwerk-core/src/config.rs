// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture-session configuration and scan-mode presets.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::types::ScanMode;

/// Auto-capture tunables.
///
/// Replaced as a whole, or merged with an [`AutoCaptureConfigUpdate`]; never
/// mutated field by field from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoCaptureConfig {
    /// Whether the controller may fire at all.
    pub enabled: bool,
    /// Composite score (0-100) a frame must reach to count toward the hold.
    pub min_quality_score: u8,
    /// How long quality must stay qualifying before capture fires.
    pub hold_duration_ms: u64,
    /// Minimum time between two automatic captures.
    pub min_capture_interval_ms: u64,
    /// Passed through to the host haptics layer; not acted on here.
    pub vibrate_feedback: bool,
}

impl Default for AutoCaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_quality_score: 80,
            hold_duration_ms: 1500,
            min_capture_interval_ms: 2000,
            vibrate_feedback: true,
        }
    }
}

impl AutoCaptureConfig {
    /// Parse from JSON. Missing keys take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.clamped())
    }

    /// Apply a partial update. Unset fields keep their current values.
    pub fn merge(&self, update: &AutoCaptureConfigUpdate) -> Self {
        Self {
            enabled: update.enabled.unwrap_or(self.enabled),
            min_quality_score: update.min_quality_score.unwrap_or(self.min_quality_score),
            hold_duration_ms: update.hold_duration_ms.unwrap_or(self.hold_duration_ms),
            min_capture_interval_ms: update
                .min_capture_interval_ms
                .unwrap_or(self.min_capture_interval_ms),
            vibrate_feedback: update.vibrate_feedback.unwrap_or(self.vibrate_feedback),
        }
        .clamped()
    }

    /// Clamp `min_quality_score` into the 0-100 score range.
    fn clamped(mut self) -> Self {
        self.min_quality_score = self.min_quality_score.min(100);
        self
    }
}

/// Partial auto-capture update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoCaptureConfigUpdate {
    pub enabled: Option<bool>,
    pub min_quality_score: Option<u8>,
    pub hold_duration_ms: Option<u64>,
    pub min_capture_interval_ms: Option<u64>,
    pub vibrate_feedback: Option<bool>,
}

/// Stability history sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StabilityConfig {
    /// Maximum number of corner samples kept.
    pub capacity: usize,
    /// Samples older than this (relative to the newest) are evicted.
    pub retention_ms: u64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            retention_ms: 1000,
        }
    }
}

/// Everything a scan session needs to start.
///
/// When deserialized, `autoCapture` is a partial override on top of the
/// preset for `mode`, so `{"mode": "book"}` yields the full Book tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SessionConfigFile", rename_all = "camelCase")]
pub struct SessionConfig {
    pub mode: ScanMode,
    pub auto_capture: AutoCaptureConfig,
    pub stability: StabilityConfig,
}

/// On-disk shape of [`SessionConfig`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionConfigFile {
    mode: ScanMode,
    auto_capture: AutoCaptureConfigUpdate,
    stability: StabilityConfig,
}

impl From<SessionConfigFile> for SessionConfig {
    fn from(file: SessionConfigFile) -> Self {
        Self {
            mode: file.mode,
            auto_capture: file.mode.auto_capture_config().merge(&file.auto_capture),
            stability: file.stability,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_mode(ScanMode::default())
    }
}

impl SessionConfig {
    /// Preset configuration for a scan mode.
    pub fn for_mode(mode: ScanMode) -> Self {
        Self {
            mode,
            auto_capture: mode.auto_capture_config(),
            stability: StabilityConfig::default(),
        }
    }

    /// Parse and validate a session config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON session config from disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Reject values that would leave the stability tracker unusable.
    pub fn validate(&self) -> Result<()> {
        if self.stability.capacity == 0 {
            return Err(ScanError::Config("stability capacity must be at least 1".into()));
        }
        if self.stability.retention_ms == 0 {
            return Err(ScanError::Config("stability retention must be positive".into()));
        }
        Ok(())
    }
}

impl ScanMode {
    /// The auto-capture tuning for this mode.
    pub fn auto_capture_config(&self) -> AutoCaptureConfig {
        let base = AutoCaptureConfig::default();
        match self {
            Self::Document => base,
            Self::Receipt => AutoCaptureConfig {
                min_quality_score: 75,
                ..base
            },
            Self::IdCard => AutoCaptureConfig {
                min_quality_score: 85,
                hold_duration_ms: 1000,
                ..base
            },
            Self::Book => AutoCaptureConfig {
                hold_duration_ms: 2000,
                min_capture_interval_ms: 2500,
                ..base
            },
        }
    }

    /// Inset (fraction of each frame side) for fallback crop corners.
    pub fn fallback_inset(&self) -> f64 {
        match self {
            Self::Document | Self::Book => 0.05,
            Self::Receipt => 0.10,
            Self::IdCard => 0.15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = AutoCaptureConfig::default();
        assert!(config.enabled);
        assert_eq!(config.min_quality_score, 80);
        assert_eq!(config.hold_duration_ms, 1500);
        assert_eq!(config.min_capture_interval_ms, 2000);
        assert!(config.vibrate_feedback);
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let config = AutoCaptureConfig::default();
        let merged = config.merge(&AutoCaptureConfigUpdate {
            hold_duration_ms: Some(900),
            ..Default::default()
        });
        assert_eq!(merged.hold_duration_ms, 900);
        assert_eq!(merged.min_quality_score, 80);
        assert!(merged.enabled);
    }

    #[test]
    fn merge_clamps_quality_threshold() {
        let merged = AutoCaptureConfig::default().merge(&AutoCaptureConfigUpdate {
            min_quality_score: Some(250),
            ..Default::default()
        });
        assert_eq!(merged.min_quality_score, 100);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = AutoCaptureConfig::from_json(r#"{"minQualityScore": 90, "enabled": false}"#)
            .expect("valid json");
        assert_eq!(config.min_quality_score, 90);
        assert!(!config.enabled);
        assert_eq!(config.hold_duration_ms, 1500);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AutoCaptureConfig::from_json("{not json").is_err());
    }

    #[test]
    fn presets_differ_by_mode() {
        assert_eq!(ScanMode::Document.auto_capture_config(), AutoCaptureConfig::default());
        assert_eq!(ScanMode::IdCard.auto_capture_config().hold_duration_ms, 1000);
        assert_eq!(ScanMode::Receipt.auto_capture_config().min_quality_score, 75);
        assert!(ScanMode::IdCard.fallback_inset() > ScanMode::Document.fallback_inset());
    }

    #[test]
    fn session_config_rejects_zero_capacity() {
        let err = SessionConfig::from_json(r#"{"stability": {"capacity": 0}}"#);
        assert!(matches!(err, Err(ScanError::Config(_))));
    }

    #[test]
    fn session_config_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"mode": "book", "autoCapture": {{"holdDurationMs": 2200}}}}"#)
            .expect("write config");
        let config = SessionConfig::load(file.path()).expect("load config");
        assert_eq!(config.mode, ScanMode::Book);
        assert_eq!(config.auto_capture.hold_duration_ms, 2200);
        assert_eq!(config.auto_capture.min_capture_interval_ms, 2500);
        assert_eq!(config.stability, StabilityConfig::default());
    }

    #[test]
    fn mode_alone_selects_the_full_preset() {
        for mode in [ScanMode::Document, ScanMode::Receipt, ScanMode::IdCard, ScanMode::Book] {
            let json = serde_json::to_string(&serde_json::json!({ "mode": mode }))
                .expect("serialize mode");
            let config = SessionConfig::from_json(&json).expect("valid config");
            assert_eq!(config.mode, mode);
            assert_eq!(config.auto_capture, mode.auto_capture_config(), "{mode:?}");
        }
    }

    #[test]
    fn empty_session_json_is_the_default_session() {
        let config = SessionConfig::from_json("{}").expect("valid config");
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn session_json_clamps_quality_threshold() {
        let config = SessionConfig::from_json(r#"{"autoCapture": {"minQualityScore": 200}}"#)
            .expect("valid config");
        assert_eq!(config.auto_capture.min_quality_score, 100);
    }

    #[test]
    fn session_config_round_trips_through_json() {
        let config = SessionConfig::for_mode(ScanMode::IdCard);
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(SessionConfig::from_json(&json).expect("parse"), config);
    }
}
