// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The single-threaded measurement engine.
//!
//! Opcodes and natives each have a single "current" slot: the VM never nests an opcode inside
//! another, so a new `begin_op` simply replaces the old one. Store accesses do nest, and they
//! interrupt the opcode that triggered them. The first store on an empty store stack moves the
//! current opcode, with the time it has accumulated so far, onto a paused stack; when the
//! store stack drains the opcode is resumed with a fresh start time. Store time is therefore
//! charged to the store operation only and never to the opcode.
//!
//! Stats are kept in 256-slot arrays indexed directly by the code byte.

use crate::clock::Clock;
use crate::config::ProfilerConfig;
use crate::error::ProtocolViolation;
use crate::gas::get_op_gas;
use crate::metrics::{
    LocationStat, NativeStat, OpStat, StackSample, StoreStat, SubOpStat, VarStat,
};
use crate::ops::{NativeOp, Op, OpContext, StackFrame, StoreOp, SubOp, SubOpContext};
use crate::recorder::Recorder;
use crate::results::Results;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{info, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

const CODE_SPACE_SIZE: usize = 256;

#[derive(Debug)]
struct OpEntry {
    op: Op,
    ctx: Option<OpContext>,
    // Time accumulated before the most recent pause.
    elapsed_ns: u64,
    start_ns: u64,
}

#[derive(Debug)]
struct StoreEntry {
    op: StoreOp,
    start_ns: u64,
    // Set on the entry that paused the current opcode.
    paused_op: bool,
}

#[derive(Debug)]
struct NativeEntry {
    op: NativeOp,
    start_ns: u64,
}

#[derive(Debug)]
struct SubOpEntry {
    op: SubOp,
    var: Option<String>,
    start_ns: u64,
}

/// Completed measurements.
#[derive(Debug)]
pub(crate) struct Accumulators {
    pub(crate) op_stats: Box<[OpStat; CODE_SPACE_SIZE]>,
    pub(crate) store_stats: Box<[StoreStat; CODE_SPACE_SIZE]>,
    pub(crate) native_stats: Box<[NativeStat; CODE_SPACE_SIZE]>,
    pub(crate) sub_op_stats: Box<[SubOpStat; CODE_SPACE_SIZE]>,
    pub(crate) location_stats: HashMap<String, LocationStat>,
    pub(crate) var_stats: HashMap<String, VarStat>,
    pub(crate) stack_samples: HashMap<String, StackSample>,
}

impl Default for Accumulators {
    fn default() -> Self {
        Self {
            op_stats: Box::new([OpStat::default(); CODE_SPACE_SIZE]),
            store_stats: Box::new([StoreStat::default(); CODE_SPACE_SIZE]),
            native_stats: Box::new([NativeStat::default(); CODE_SPACE_SIZE]),
            sub_op_stats: Box::new([SubOpStat::default(); CODE_SPACE_SIZE]),
            location_stats: HashMap::new(),
            var_stats: HashMap::new(),
            stack_samples: HashMap::new(),
        }
    }
}

impl Accumulators {
    fn is_empty(&self) -> bool {
        self.op_stats.iter().all(|s| s.timing.is_empty())
            && self.store_stats.iter().all(|s| s.timing.is_empty())
            && self.native_stats.iter().all(|s| s.timing.is_empty())
            && self.sub_op_stats.iter().all(|s| s.timing.is_empty())
            && self.location_stats.is_empty()
            && self.var_stats.is_empty()
            && self.stack_samples.is_empty()
    }
}

#[cold]
#[track_caller]
fn violation(v: ProtocolViolation) -> ! {
    panic!("{v}")
}

/// Measurement engine for one VM. Not thread-safe: all recording happens on the thread that
/// drives the VM. Lifecycle transitions go through an atomic so that racing `start`/`stop`
/// calls fail cleanly.
#[derive(Debug)]
pub struct Profiler {
    state: AtomicU8,
    config: ProfilerConfig,
    clock: Clock,
    start_time: Option<DateTime<Utc>>,

    current_op: Option<OpEntry>,
    paused_ops: Vec<OpEntry>,
    store_stack: Vec<StoreEntry>,
    current_native: Option<NativeEntry>,
    sub_op_stack: Vec<SubOpEntry>,
    call_stack: Vec<StackFrame>,

    acc: Accumulators,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self::with_clock(config, Clock::monotonic())
    }

    pub fn with_clock(config: ProfilerConfig, clock: Clock) -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            config,
            clock,
            start_time: None,
            current_op: None,
            paused_ops: Vec::new(),
            store_stack: Vec::new(),
            current_native: None,
            sub_op_stack: Vec::new(),
            call_stack: Vec::new(),
            acc: Accumulators::default(),
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Begin a session. Anything recorded outside a session is discarded first.
    pub fn start(&mut self) -> Result<(), ProtocolViolation> {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ProtocolViolation::AlreadyRunning)?;

        if !self.acc.is_empty() || self.in_flight() > 0 {
            warn!("discarding measurements recorded outside of a profiling session");
            self.clear();
        }
        self.start_time = Some(Utc::now());
        info!(
            timing = self.config.timing,
            call_stacks = self.config.call_stacks,
            "profiling session started"
        );
        Ok(())
    }

    /// End the session and snapshot everything recorded in it. The profiler is left idle
    /// and empty, ready for another `start`.
    pub fn stop(&mut self) -> Result<Results, ProtocolViolation> {
        self.state
            .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ProtocolViolation::NotRunning)?;

        let end_time = Utc::now();
        let start_time = self.start_time.unwrap_or(end_time);
        let results = Results::build(&self.acc, start_time, end_time, self.config.timing);
        self.clear();

        info!(
            ops = results.total_op_count(),
            gas = results.total_gas(),
            duration_ms = results.duration().num_milliseconds(),
            "profiling session stopped"
        );
        Ok(results)
    }

    /// Discard everything recorded so far.
    pub fn reset(&mut self) -> Result<(), ProtocolViolation> {
        if self.is_running() {
            return Err(ProtocolViolation::ResetWhileRunning);
        }
        self.clear();
        self.state.store(IDLE, Ordering::Release);
        Ok(())
    }

    /// Drop in-flight measurements after the instrumented code panicked mid-measurement.
    /// Completed measurements and the lifecycle state are untouched. Call this from the
    /// handler that caught the panic, before recording anything else.
    pub fn recovery(&mut self) {
        let dropped = self.in_flight();
        self.clear_in_flight();
        if dropped > 0 {
            warn!(dropped, "recovered profiler: dropped in-flight measurements");
        }
    }

    fn in_flight(&self) -> usize {
        usize::from(self.current_op.is_some())
            + self.paused_ops.len()
            + self.store_stack.len()
            + usize::from(self.current_native.is_some())
            + self.sub_op_stack.len()
            + self.call_stack.len()
    }

    fn clear_in_flight(&mut self) {
        self.current_op = None;
        self.paused_ops.clear();
        self.store_stack.clear();
        self.current_native = None;
        self.sub_op_stack.clear();
        self.call_stack.clear();
    }

    fn clear(&mut self) {
        self.clear_in_flight();
        self.acc = Accumulators::default();
        self.start_time = None;
    }

    #[inline]
    fn now(&self) -> u64 {
        if self.config.timing {
            self.clock.now_ns()
        } else {
            0
        }
    }

    #[inline]
    fn since(&self, start_ns: u64) -> u64 {
        if self.config.timing {
            self.clock.now_ns().saturating_sub(start_ns)
        } else {
            0
        }
    }

    fn record_stack_sample(&mut self, ctx: Option<&OpContext>, dur_ns: u64, gas: i64) {
        let mut frames = self.call_stack.clone();
        if let Some(ctx) = ctx.filter(|c| c.is_attributed()) {
            frames.push(StackFrame::from_context(ctx));
        }
        let signature = StackSample::signature(&frames);
        self.acc
            .stack_samples
            .entry(signature)
            .or_insert_with(|| StackSample::new(frames))
            .record(dur_ns, gas);
    }
}

impl Recorder for Profiler {
    #[inline]
    fn begin_op(&mut self, op: Op, ctx: Option<OpContext>) {
        self.current_op = Some(OpEntry {
            op,
            ctx,
            elapsed_ns: 0,
            start_ns: self.now(),
        });
    }

    fn set_op_context(&mut self, ctx: OpContext) {
        // A store access may have paused the opcode; it is still in flight.
        let entry = match self.current_op.as_mut() {
            Some(entry) => Some(entry),
            None if !self.store_stack.is_empty() => self.paused_ops.last_mut(),
            None => None,
        };
        match entry {
            Some(entry) => entry.ctx = Some(ctx),
            None => violation(ProtocolViolation::ContextWithoutOp),
        }
    }

    fn end_op(&mut self) {
        let Some(entry) = self.current_op.take() else {
            violation(ProtocolViolation::EndOpWithoutBegin)
        };
        let dur_ns = entry.elapsed_ns + self.since(entry.start_ns);
        let gas = get_op_gas(entry.op);

        self.acc.op_stats[entry.op.index()].record(dur_ns, gas);

        if let Some(ctx) = entry.ctx.as_ref().filter(|c| c.is_attributed()) {
            self.acc
                .location_stats
                .entry(ctx.location_key())
                .or_insert_with(|| {
                    LocationStat::new(
                        ctx.file.clone(),
                        ctx.line,
                        ctx.func.clone(),
                        ctx.pkg_path.clone(),
                    )
                })
                .record(dur_ns, gas);
        }

        if self.config.call_stacks && !self.call_stack.is_empty() {
            self.record_stack_sample(entry.ctx.as_ref(), dur_ns, gas);
        }
    }

    fn begin_store(&mut self, op: StoreOp) {
        let now = self.now();
        let mut paused_op = false;
        if self.store_stack.is_empty() {
            if let Some(mut current) = self.current_op.take() {
                current.elapsed_ns += now.saturating_sub(current.start_ns);
                self.paused_ops.push(current);
                paused_op = true;
            }
        }
        self.store_stack.push(StoreEntry {
            op,
            start_ns: now,
            paused_op,
        });
    }

    fn end_store(&mut self, size: u64) {
        let Some(entry) = self.store_stack.pop() else {
            violation(ProtocolViolation::EndStoreWithoutBegin)
        };
        let now = self.now();
        let dur_ns = now.saturating_sub(entry.start_ns);
        self.acc.store_stats[entry.op.index()].record(dur_ns, size);

        if entry.paused_op {
            if let Some(mut resumed) = self.paused_ops.pop() {
                resumed.start_ns = now;
                self.current_op = Some(resumed);
            }
        }
    }

    #[inline]
    fn begin_native(&mut self, op: NativeOp) {
        self.current_native = Some(NativeEntry {
            op,
            start_ns: self.now(),
        });
    }

    fn end_native(&mut self) {
        let Some(entry) = self.current_native.take() else {
            violation(ProtocolViolation::EndNativeWithoutBegin)
        };
        let dur_ns = self.since(entry.start_ns);
        self.acc.native_stats[entry.op.index()].record(dur_ns);
    }

    fn begin_sub_op(&mut self, op: SubOp, ctx: SubOpContext) {
        self.sub_op_stack.push(SubOpEntry {
            op,
            var: ctx.var_key(),
            start_ns: self.now(),
        });
    }

    fn end_sub_op(&mut self) {
        let Some(entry) = self.sub_op_stack.pop() else {
            violation(ProtocolViolation::EndSubOpWithoutBegin)
        };
        let dur_ns = self.since(entry.start_ns);
        self.acc.sub_op_stats[entry.op.index()].record(dur_ns);
        if let Some(var) = entry.var {
            self.acc
                .var_stats
                .entry(var)
                .or_insert_with_key(|name| VarStat::new(name.clone()))
                .record(dur_ns);
        }
    }

    fn push_frame(&mut self, frame: StackFrame) {
        if self.config.call_stacks {
            self.call_stack.push(frame);
        }
    }

    fn pop_frame(&mut self) {
        if !self.config.call_stacks {
            return;
        }
        if self.call_stack.pop().is_none() {
            violation(ProtocolViolation::FrameUnderflow);
        }
    }
}

#[cfg(test)]
#[path = "unit_tests/profiler_tests.rs"]
mod profiler_tests;
