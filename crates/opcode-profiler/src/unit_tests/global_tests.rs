// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::*;
use parking_lot::MutexGuard;
use std::panic::catch_unwind;
use std::sync::Barrier;
use std::thread;

// The session is process-wide, so tests touching it take turns.
static SERIAL: Mutex<()> = parking_lot::const_mutex(());

struct Serial(#[allow(dead_code)] MutexGuard<'static, ()>);

fn serial() -> Serial {
    let guard = SERIAL.lock();
    if is_running() {
        stop();
    }
    Serial(guard)
}

impl Drop for Serial {
    // Leave no session behind, including when a test panics on purpose.
    fn drop(&mut self) {
        if is_running() {
            stop();
        }
    }
}

#[test]
fn idle_recorder_is_noop() {
    let _serial = serial();
    assert!(!is_running());
    let mut rec = r();
    assert!(!rec.is_active());
    // Unbalanced calls are fine when nothing is listening.
    rec.end_op();
    rec.end_store(0);
    rec.pop_frame();
}

#[test]
fn session_records_through_global_recorder() {
    let _serial = serial();
    start(ProfilerConfig::default());
    assert!(is_running());
    assert!(r().is_active());

    r().begin_op(Op::ADD, None);
    r().begin_store(StoreOp::GET_OBJECT);
    r().end_store(16);
    r().end_op();
    r().begin_native(NativeOp::PRINT);
    r().end_native();

    let results = stop();
    assert!(!is_running());
    assert!(!r().is_active());
    assert_eq!(results.op_stats["OpAdd"].timing.count, 1);
    assert_eq!(results.store_stats["StoreGetObject"].total_bytes, 16);
    assert_eq!(results.native_stats["NativePrint"].timing.count, 1);
}

#[test]
fn sessions_do_not_share_data() {
    let _serial = serial();
    start(ProfilerConfig::default());
    r().begin_op(Op::ADD, None);
    r().end_op();
    let first = stop();

    start(ProfilerConfig::default().without_timing());
    let second = stop();

    assert_eq!(first.total_op_count(), 1);
    assert!(second.is_empty());
    assert!(!second.timing_enabled);
}

#[test]
fn stale_handle_is_detached_from_next_session() {
    let _serial = serial();
    start(ProfilerConfig::default());
    let mut stale = r();
    stop();

    start(ProfilerConfig::default());
    stale.begin_op(Op::MUL, None);
    stale.end_op();
    let results = stop();
    assert!(results.is_empty());
}

#[test]
fn recovery_clears_in_flight_work() {
    let _serial = serial();
    // No session: nothing to recover.
    recovery();

    start(ProfilerConfig::default());
    r().begin_op(Op::MUL, None);
    r().begin_store(StoreOp::GET_OBJECT);
    recovery();
    r().begin_op(Op::ADD, None);
    r().end_op();
    let results = stop();

    assert!(!results.op_stats.contains_key("OpMul"));
    assert!(results.store_stats.is_empty());
    assert_eq!(results.op_stats["OpAdd"].timing.count, 1);
}

#[test]
fn reset_when_idle_is_allowed() {
    let _serial = serial();
    reset();
    assert!(!is_running());
}

#[test]
#[should_panic(expected = "profiler not running")]
fn stop_without_start_panics() {
    let _serial = serial();
    stop();
}

#[test]
#[should_panic(expected = "profiler not running")]
fn stop_twice_panics() {
    let _serial = serial();
    start(ProfilerConfig::default());
    stop();
    stop();
}

#[test]
#[should_panic(expected = "profiler already running")]
fn double_start_panics() {
    let _serial = serial();
    start(ProfilerConfig::default());
    start(ProfilerConfig::default());
}

#[test]
#[should_panic(expected = "cannot reset a running profiler")]
fn reset_while_running_panics() {
    let _serial = serial();
    start(ProfilerConfig::default());
    reset();
}

#[test]
#[should_panic(expected = "EndOp called without a matching BeginOp")]
fn recording_violations_surface_through_handle() {
    let _serial = serial();
    start(ProfilerConfig::default());
    r().end_op();
}

const RACERS: usize = 8;

// Run `f` on RACERS threads released together; true for each call that returned normally.
fn race<T: Send + 'static>(f: fn() -> T) -> Vec<bool> {
    let barrier = Arc::new(Barrier::new(RACERS));
    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                catch_unwind(f).is_ok()
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn start_default() {
    start(ProfilerConfig::default())
}

#[test]
fn racing_starts_admit_exactly_one() {
    let _serial = serial();
    let outcomes = race(start_default);
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert!(is_running());
}

#[test]
fn racing_stops_admit_exactly_one() {
    let _serial = serial();
    start(ProfilerConfig::default());
    let outcomes = race(stop);
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    assert!(!is_running());
}

#[test]
#[should_panic(expected = "concurrent lifecycle transition")]
fn stale_transition_is_rejected() {
    let _serial = serial();
    let stale = STATE.load_full();
    start(ProfilerConfig::default());
    // Another caller moved the state on since `stale` was read.
    transition(&stale, Arc::new(GlobalState::Idle));
}
