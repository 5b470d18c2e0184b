// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::metrics::{
    LocationStat, NativeStat, OpStat, StackSample, StoreStat, SubOpStat, VarStat,
};
use crate::ops::{NativeOp, Op, StoreOp, SubOp};
use crate::profiler::Accumulators;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable snapshot of one profiling session.
///
/// Produced once per `Profiler::stop`. Everything is owned, so the profiler that produced it
/// can be reused without affecting the snapshot, and it can be shared across threads freely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timing_enabled: bool,
    pub op_stats: BTreeMap<String, OpStat>,
    pub store_stats: BTreeMap<String, StoreStat>,
    pub native_stats: BTreeMap<String, NativeStat>,
    pub sub_op_stats: BTreeMap<String, SubOpStat>,
    pub location_stats: BTreeMap<String, LocationStat>,
    pub var_stats: BTreeMap<String, VarStat>,
    #[serde(default)]
    pub stack_samples: Vec<StackSample>,
}

// Several unknown codes share one name, so slots are merged rather than inserted.
fn named_slots<S, C, F>(
    slots: &[S],
    is_empty: impl Fn(&S) -> bool,
    code: C,
    merge: F,
) -> BTreeMap<String, S>
where
    S: Copy,
    C: Fn(u8) -> &'static str,
    F: Fn(&mut S, &S),
{
    let mut named = BTreeMap::new();
    for (i, stat) in slots.iter().enumerate() {
        if is_empty(stat) {
            continue;
        }
        named
            .entry(code(i as u8).to_string())
            .and_modify(|existing: &mut S| merge(existing, stat))
            .or_insert(*stat);
    }
    named
}

impl Results {
    pub(crate) fn build(
        acc: &Accumulators,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        timing_enabled: bool,
    ) -> Self {
        let mut stack_samples: Vec<StackSample> = acc.stack_samples.values().cloned().collect();
        stack_samples.sort_by(|a, b| a.frames.cmp(&b.frames));

        Self {
            start_time,
            end_time,
            timing_enabled,
            op_stats: named_slots(
                &acc.op_stats[..],
                |s| s.timing.is_empty(),
                |c| Op(c).name(),
                OpStat::merge,
            ),
            store_stats: named_slots(
                &acc.store_stats[..],
                |s| s.timing.is_empty(),
                |c| StoreOp(c).name(),
                StoreStat::merge,
            ),
            native_stats: named_slots(
                &acc.native_stats[..],
                |s| s.timing.is_empty(),
                |c| NativeOp(c).name(),
                NativeStat::merge,
            ),
            sub_op_stats: named_slots(
                &acc.sub_op_stats[..],
                |s| s.timing.is_empty(),
                |c| SubOp(c).name(),
                SubOpStat::merge,
            ),
            location_stats: acc
                .location_stats
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            var_stats: acc
                .var_stats
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            stack_samples,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    pub fn total_op_count(&self) -> u64 {
        self.op_stats.values().map(|s| s.timing.count).sum()
    }

    pub fn total_gas(&self) -> i64 {
        self.op_stats.values().map(|s| s.gas).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.op_stats.is_empty()
            && self.store_stats.is_empty()
            && self.native_stats.is_empty()
            && self.sub_op_stats.is_empty()
            && self.location_stats.is_empty()
            && self.var_stats.is_empty()
            && self.stack_samples.is_empty()
    }

    /// Fold another session's aggregates into this one. The merged window spans both sessions
    /// and timing is only considered enabled if it was enabled in both.
    pub fn merge(&mut self, other: &Results) {
        self.start_time = self.start_time.min(other.start_time);
        self.end_time = self.end_time.max(other.end_time);
        self.timing_enabled &= other.timing_enabled;

        for (name, stat) in &other.op_stats {
            self.op_stats.entry(name.clone()).or_default().merge(stat);
        }
        for (name, stat) in &other.store_stats {
            self.store_stats.entry(name.clone()).or_default().merge(stat);
        }
        for (name, stat) in &other.native_stats {
            self.native_stats.entry(name.clone()).or_default().merge(stat);
        }
        for (name, stat) in &other.sub_op_stats {
            self.sub_op_stats.entry(name.clone()).or_default().merge(stat);
        }
        for (key, stat) in &other.location_stats {
            self.location_stats
                .entry(key.clone())
                .and_modify(|s| s.merge(stat))
                .or_insert_with(|| stat.clone());
        }
        for (key, stat) in &other.var_stats {
            self.var_stats
                .entry(key.clone())
                .and_modify(|s| s.merge(stat))
                .or_insert_with(|| stat.clone());
        }
        for sample in &other.stack_samples {
            match self
                .stack_samples
                .iter_mut()
                .find(|s| s.frames == sample.frames)
            {
                Some(existing) => existing.merge(sample),
                None => self.stack_samples.push(sample.clone()),
            }
        }
        self.stack_samples.sort_by(|a, b| a.frames.cmp(&b.frames));
    }
}

#[cfg(test)]
#[path = "unit_tests/results_tests.rs"]
mod results_tests;
