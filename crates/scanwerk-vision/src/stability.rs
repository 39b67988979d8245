// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stability history — a bounded, time-pruned buffer of recent corner samples.
//
// The tracker only answers "what did the outline look like recently". The
// movement-to-score mapping lives in `quality`, so scoring weights can change
// without touching storage.

use std::collections::VecDeque;

use scanwerk_core::{CornerSample, Quad, StabilityConfig, TimestampMs};
use tracing::debug;

/// Recent corner samples, oldest first.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    samples: VecDeque<CornerSample>,
    capacity: usize,
    retention_ms: u64,
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new(StabilityConfig::default())
    }
}

impl StabilityTracker {
    pub fn new(config: StabilityConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            retention_ms: config.retention_ms,
        }
    }

    /// Record a sample and evict everything older than the retention horizon
    /// (measured from this sample) or beyond capacity.
    ///
    /// A timestamp earlier than the newest stored sample means the host clock
    /// restarted; the stale history is dropped rather than mixed in.
    pub fn add(&mut self, quad: Quad, timestamp_ms: TimestampMs) {
        if self.latest().is_some_and(|last| timestamp_ms < last.timestamp_ms) {
            debug!(timestamp_ms, "stability history reset: timestamp went backwards");
            self.samples.clear();
        }

        self.samples.push_back(CornerSample { quad, timestamp_ms });

        while self
            .samples
            .front()
            .is_some_and(|s| timestamp_ms.saturating_sub(s.timestamp_ms) > self.retention_ms)
        {
            self.samples.pop_front();
        }
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Samples no older than `window_ms` relative to the newest sample.
    pub fn samples_within(&self, window_ms: u64) -> impl Iterator<Item = &CornerSample> + '_ {
        let newest = self.latest().map_or(0, |s| s.timestamp_ms);
        self.samples
            .iter()
            .filter(move |s| newest.saturating_sub(s.timestamp_ms) <= window_ms)
    }

    /// Most recently added sample.
    pub fn latest(&self) -> Option<&CornerSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
