// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Instrumentation engine for bytecode VMs.
//!
//! A VM reports opcodes, store accesses, native calls and sub-steps through the [`Recorder`]
//! trait. The [`Profiler`] attributes wall-clock time, static gas and bytes moved to each of
//! them, including when store accesses interrupt an opcode, and on `stop` produces an
//! immutable [`Results`] snapshot that can be exported as JSON, CSV, pprof, a text report or
//! legacy fixed-width binary records.
//!
//! ```
//! use opcode_profiler::{Op, Profiler, ProfilerConfig, Recorder};
//!
//! let mut profiler = Profiler::new(ProfilerConfig::default());
//! profiler.start().unwrap();
//! profiler.begin_op(Op::ADD, None);
//! profiler.end_op();
//! let results = profiler.stop().unwrap();
//! assert_eq!(results.op_stats["OpAdd"].timing.count, 1);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod gas;
pub mod global;
pub mod metrics;
pub mod ops;
pub mod profiler;
pub mod recorder;
pub mod results;

pub use clock::{Clock, ManualClock};
pub use config::ProfilerConfig;
pub use error::{ProfilerError, ProfilerResult, ProtocolViolation};
pub use gas::get_op_gas;
pub use global::{is_running, r, GlobalRecorder};
pub use metrics::{
    LocationStat, NativeStat, OpStat, StackSample, StoreStat, SubOpStat, TimingStat, VarStat,
};
pub use ops::{NativeOp, Op, OpContext, StackFrame, StoreOp, SubOp, SubOpContext, UNKNOWN};
pub use profiler::Profiler;
pub use recorder::{NoopRecorder, Recorder};
pub use results::Results;
