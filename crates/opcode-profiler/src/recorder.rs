// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::ops::{NativeOp, Op, OpContext, StackFrame, StoreOp, SubOp, SubOpContext};

/// The instrumentation points a VM calls while executing.
///
/// Calls must come from the single thread driving the VM. Begin/End calls pair up per code
/// space; an End with no matching Begin is a wiring bug and panics.
pub trait Recorder {
    /// Start measuring `op`, replacing any opcode already in flight.
    fn begin_op(&mut self, op: Op, ctx: Option<OpContext>);

    /// Attach source attribution to the opcode in flight.
    fn set_op_context(&mut self, ctx: OpContext);

    fn end_op(&mut self);

    /// Start a store access. The first store access while an opcode is in flight pauses that
    /// opcode until the store stack empties again.
    fn begin_store(&mut self, op: StoreOp);

    /// Finish the innermost store access, which moved `size` bytes.
    fn end_store(&mut self, size: u64);

    fn begin_native(&mut self, op: NativeOp);

    fn end_native(&mut self);

    fn begin_sub_op(&mut self, op: SubOp, ctx: SubOpContext);

    fn end_sub_op(&mut self);

    fn push_frame(&mut self, frame: StackFrame);

    fn pop_frame(&mut self);
}

/// Recorder that does nothing, for VMs running without a profiling session.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    #[inline(always)]
    fn begin_op(&mut self, _op: Op, _ctx: Option<OpContext>) {}

    #[inline(always)]
    fn set_op_context(&mut self, _ctx: OpContext) {}

    #[inline(always)]
    fn end_op(&mut self) {}

    #[inline(always)]
    fn begin_store(&mut self, _op: StoreOp) {}

    #[inline(always)]
    fn end_store(&mut self, _size: u64) {}

    #[inline(always)]
    fn begin_native(&mut self, _op: NativeOp) {}

    #[inline(always)]
    fn end_native(&mut self) {}

    #[inline(always)]
    fn begin_sub_op(&mut self, _op: SubOp, _ctx: SubOpContext) {}

    #[inline(always)]
    fn end_sub_op(&mut self) {}

    #[inline(always)]
    fn push_frame(&mut self, _frame: StackFrame) {}

    #[inline(always)]
    fn pop_frame(&mut self) {}
}
