// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Streaming statistic accumulators.
//!
//! Every accumulator is a [`TimingStat`] plus at most one extra field. All of them merge
//! commutatively and associatively, so partial aggregates collected independently (per
//! session, per worker) can be combined after the fact.

use crate::ops::StackFrame;
use serde::{Deserialize, Serialize};

/// Count, total, extremes and sum of squares of a stream of durations in nanoseconds.
///
/// A zero-duration sample is valid and only bumps `count`; this is how counts are kept when
/// timing is disabled. `min_ns == 0` means no timed sample has been seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStat {
    pub count: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    #[serde(default)]
    pub sum_sq_ns: f64,
}

impl TimingStat {
    #[inline]
    pub fn record(&mut self, dur_ns: u64) {
        self.count += 1;
        if dur_ns == 0 {
            return;
        }
        self.total_ns = self.total_ns.saturating_add(dur_ns);
        if self.min_ns == 0 || dur_ns < self.min_ns {
            self.min_ns = dur_ns;
        }
        if dur_ns > self.max_ns {
            self.max_ns = dur_ns;
        }
        let d = dur_ns as f64;
        self.sum_sq_ns += d * d;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn avg_ns(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_ns / self.count
        }
    }

    /// Population standard deviation, `sqrt(E[X^2] - E[X]^2)`. Zero for fewer than two
    /// samples, and clamped at zero when cancellation drives the variance negative.
    pub fn std_dev_ns(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.total_ns as f64 / n;
        let variance = self.sum_sq_ns / n - mean * mean;
        if variance <= 0.0 {
            0.0
        } else {
            variance.sqrt()
        }
    }

    pub fn merge(&mut self, other: &TimingStat) {
        self.count += other.count;
        self.total_ns = self.total_ns.saturating_add(other.total_ns);
        self.min_ns = match (self.min_ns, other.min_ns) {
            (0, m) | (m, 0) => m,
            (a, b) => a.min(b),
        };
        self.max_ns = self.max_ns.max(other.max_ns);
        self.sum_sq_ns += other.sum_sq_ns;
    }
}

/// Per-opcode statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpStat {
    #[serde(flatten)]
    pub timing: TimingStat,
    pub gas: i64,
}

impl OpStat {
    #[inline]
    pub fn record(&mut self, dur_ns: u64, gas: i64) {
        self.timing.record(dur_ns);
        self.gas = self.gas.saturating_add(gas);
    }

    pub fn merge(&mut self, other: &OpStat) {
        self.timing.merge(&other.timing);
        self.gas = self.gas.saturating_add(other.gas);
    }
}

/// Per-store-operation statistics with bytes moved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStat {
    #[serde(flatten)]
    pub timing: TimingStat,
    pub total_bytes: u64,
}

impl StoreStat {
    #[inline]
    pub fn record(&mut self, dur_ns: u64, size: u64) {
        self.timing.record(dur_ns);
        self.total_bytes = self.total_bytes.saturating_add(size);
    }

    pub fn avg_bytes(&self) -> u64 {
        if self.timing.count == 0 {
            0
        } else {
            self.total_bytes / self.timing.count
        }
    }

    pub fn merge(&mut self, other: &StoreStat) {
        self.timing.merge(&other.timing);
        self.total_bytes = self.total_bytes.saturating_add(other.total_bytes);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeStat {
    #[serde(flatten)]
    pub timing: TimingStat,
}

impl NativeStat {
    #[inline]
    pub fn record(&mut self, dur_ns: u64) {
        self.timing.record(dur_ns);
    }

    pub fn merge(&mut self, other: &NativeStat) {
        self.timing.merge(&other.timing);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubOpStat {
    #[serde(flatten)]
    pub timing: TimingStat,
}

impl SubOpStat {
    #[inline]
    pub fn record(&mut self, dur_ns: u64) {
        self.timing.record(dur_ns);
    }

    pub fn merge(&mut self, other: &SubOpStat) {
        self.timing.merge(&other.timing);
    }
}

/// Aggregate cost attributed to one source line, keyed `file:line`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationStat {
    pub file: String,
    pub line: i32,
    #[serde(default)]
    pub func: String,
    #[serde(default)]
    pub pkg_path: String,
    #[serde(flatten)]
    pub timing: TimingStat,
    pub gas: i64,
}

impl LocationStat {
    pub fn new(file: String, line: i32, func: String, pkg_path: String) -> Self {
        Self {
            file,
            line,
            func,
            pkg_path,
            ..Default::default()
        }
    }

    #[inline]
    pub fn record(&mut self, dur_ns: u64, gas: i64) {
        self.timing.record(dur_ns);
        self.gas = self.gas.saturating_add(gas);
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    pub fn merge(&mut self, other: &LocationStat) {
        if self.func.is_empty() {
            self.func.clone_from(&other.func);
        }
        if self.pkg_path.is_empty() {
            self.pkg_path.clone_from(&other.pkg_path);
        }
        self.timing.merge(&other.timing);
        self.gas = self.gas.saturating_add(other.gas);
    }
}

/// Time spent in sub-ops touching one variable, keyed by name or `#<index>`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VarStat {
    pub name: String,
    #[serde(flatten)]
    pub timing: TimingStat,
}

impl VarStat {
    pub fn new(name: String) -> Self {
        Self {
            name,
            timing: TimingStat::default(),
        }
    }

    #[inline]
    pub fn record(&mut self, dur_ns: u64) {
        self.timing.record(dur_ns);
    }

    pub fn merge(&mut self, other: &VarStat) {
        self.timing.merge(&other.timing);
    }
}

/// One aggregated call-stack signature. Frames are ordered root first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSample {
    pub frames: Vec<StackFrame>,
    pub gas: i64,
    pub duration_ns: u64,
    pub count: u64,
}

impl StackSample {
    pub fn new(frames: Vec<StackFrame>) -> Self {
        Self {
            frames,
            ..Default::default()
        }
    }

    #[inline]
    pub fn record(&mut self, dur_ns: u64, gas: i64) {
        self.count += 1;
        self.gas = self.gas.saturating_add(gas);
        self.duration_ns = self.duration_ns.saturating_add(dur_ns);
    }

    /// Aggregation key. Frames are joined root first, `;` separated, as in folded stacks.
    pub fn signature(frames: &[StackFrame]) -> String {
        let mut key = String::new();
        for (i, frame) in frames.iter().enumerate() {
            if i > 0 {
                key.push(';');
            }
            key.push_str(&frame.display_name());
            key.push('@');
            key.push_str(&frame.file);
            key.push(':');
            key.push_str(&frame.line.to_string());
        }
        key
    }

    pub fn merge(&mut self, other: &StackSample) {
        self.count += other.count;
        self.gas = self.gas.saturating_add(other.gas);
        self.duration_ns = self.duration_ns.saturating_add(other.duration_ns);
    }
}

#[cfg(test)]
#[path = "unit_tests/metrics_tests.rs"]
mod metrics_tests;
