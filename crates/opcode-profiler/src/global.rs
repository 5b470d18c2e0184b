// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Optional process-wide profiling session.
//!
//! VMs that can take a [`Recorder`] by injection should do so and own their [`Profiler`]
//! directly. This module is for call sites that cannot: they call [`r()`] at every
//! instrumentation point and get a no-op recorder unless a session is active.
//!
//! The session state is an immutable value behind an [`ArcSwap`]; transitions replace it with
//! a compare-and-swap, so two threads racing `start`/`stop` make one of them panic instead of
//! corrupting the session.

use crate::config::ProfilerConfig;
use crate::error::ProtocolViolation;
use crate::ops::{NativeOp, Op, OpContext, StackFrame, StoreOp, SubOp, SubOpContext};
use crate::profiler::Profiler;
use crate::recorder::{NoopRecorder, Recorder};
use crate::results::Results;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

enum GlobalState {
    Idle,
    Running(Arc<Mutex<Profiler>>),
}

static STATE: Lazy<ArcSwap<GlobalState>> =
    Lazy::new(|| ArcSwap::from_pointee(GlobalState::Idle));

#[track_caller]
fn fatal(v: ProtocolViolation) -> ! {
    panic!("{v}")
}

// Replace `current` with `new`, panicking if another thread got there first.
fn transition(current: &Arc<GlobalState>, new: Arc<GlobalState>) {
    let previous = STATE.compare_and_swap(current, new);
    if !Arc::ptr_eq(&previous, current) {
        fatal(ProtocolViolation::ConcurrentTransition);
    }
}

/// Start the process-wide session. Panics if one is already running.
pub fn start(config: ProfilerConfig) {
    let current = STATE.load_full();
    if matches!(*current, GlobalState::Running(_)) {
        fatal(ProtocolViolation::AlreadyRunning);
    }
    let mut profiler = Profiler::new(config);
    profiler.start().unwrap_or_else(|e| fatal(e));
    transition(
        &current,
        Arc::new(GlobalState::Running(Arc::new(Mutex::new(profiler)))),
    );
}

/// Stop the process-wide session and return its snapshot. Panics if none is running.
pub fn stop() -> Results {
    let current = STATE.load_full();
    let GlobalState::Running(profiler) = &*current else {
        fatal(ProtocolViolation::NotRunning)
    };
    let profiler = profiler.clone();
    transition(&current, Arc::new(GlobalState::Idle));
    let results = profiler.lock().stop().unwrap_or_else(|e| fatal(e));
    results
}

/// Return to "no active profiler". Panics while a session is running.
pub fn reset() {
    let current = STATE.load_full();
    if matches!(*current, GlobalState::Running(_)) {
        fatal(ProtocolViolation::ResetWhileRunning);
    }
    transition(&current, Arc::new(GlobalState::Idle));
}

pub fn is_running() -> bool {
    matches!(**STATE.load(), GlobalState::Running(_))
}

/// The recorder for the current session, or a no-op one when none is active.
pub fn r() -> GlobalRecorder {
    match &**STATE.load() {
        GlobalState::Idle => GlobalRecorder::Noop(NoopRecorder),
        GlobalState::Running(profiler) => GlobalRecorder::Active(profiler.clone()),
    }
}

/// Drop in-flight measurements of the running session, if any. See [`Profiler::recovery`].
pub fn recovery() {
    if let GlobalState::Running(profiler) = &**STATE.load() {
        profiler.lock().recovery();
    }
}

/// Handle returned by [`r()`]. The active variant forwards to the session's profiler; the
/// lock is never contended because recording happens on one thread.
pub enum GlobalRecorder {
    Noop(NoopRecorder),
    Active(Arc<Mutex<Profiler>>),
}

impl GlobalRecorder {
    pub fn is_active(&self) -> bool {
        matches!(self, GlobalRecorder::Active(_))
    }
}

macro_rules! forward {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            GlobalRecorder::Noop(noop) => noop.$method($($arg),*),
            GlobalRecorder::Active(profiler) => profiler.lock().$method($($arg),*),
        }
    };
}

impl Recorder for GlobalRecorder {
    fn begin_op(&mut self, op: Op, ctx: Option<OpContext>) {
        forward!(self, begin_op(op, ctx))
    }

    fn set_op_context(&mut self, ctx: OpContext) {
        forward!(self, set_op_context(ctx))
    }

    fn end_op(&mut self) {
        forward!(self, end_op())
    }

    fn begin_store(&mut self, op: StoreOp) {
        forward!(self, begin_store(op))
    }

    fn end_store(&mut self, size: u64) {
        forward!(self, end_store(size))
    }

    fn begin_native(&mut self, op: NativeOp) {
        forward!(self, begin_native(op))
    }

    fn end_native(&mut self) {
        forward!(self, end_native())
    }

    fn begin_sub_op(&mut self, op: SubOp, ctx: SubOpContext) {
        forward!(self, begin_sub_op(op, ctx))
    }

    fn end_sub_op(&mut self) {
        forward!(self, end_sub_op())
    }

    fn push_frame(&mut self, frame: StackFrame) {
        forward!(self, push_frame(frame))
    }

    fn pop_frame(&mut self) {
        forward!(self, pop_frame())
    }
}

#[cfg(test)]
#[path = "unit_tests/global_tests.rs"]
mod global_tests;
