// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use opcode_profiler::export::legacy::{self, RecordKind, RECORD_SIZE};
use opcode_profiler::export::pprof::{build_profile, proto, write_pprof};
use opcode_profiler::export::{csv, json, report, CsvSection, PprofOptions, ReportOptions};
use opcode_profiler::{
    get_op_gas, Clock, NativeOp, Op, OpContext, Profiler, ProfilerConfig, ProfilerError,
    Recorder, Results, StackFrame, StoreOp, SubOp, SubOpContext,
};
use prost::Message;
use std::fs::File;
use std::io::BufReader;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PKG: &str = "gno.land/r/demo";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small session with every kind of measurement:
/// two attributed `OpAdd` (10ns and 30ns) under `main`, one `OpMul` interrupted by a 100ns
/// store read, a native call, a sub-op on `x` and one unknown opcode outside any frame.
fn session(config: ProfilerConfig) -> Results {
    init_tracing();
    let (clock, time) = Clock::manual();
    let mut p = Profiler::with_clock(config, clock);
    p.start().unwrap();

    p.push_frame(StackFrame::new("main", "main.gno", 1).with_pkg_path(PKG));
    for ns in [10, 30] {
        let ctx = OpContext::new("main.gno", 3)
            .with_func("main")
            .with_pkg_path(PKG);
        p.begin_op(Op::ADD, Some(ctx));
        time.advance(Duration::from_nanos(ns));
        p.end_op();
    }
    p.begin_op(Op::MUL, None);
    time.advance(Duration::from_nanos(5));
    p.begin_store(StoreOp::GET_OBJECT);
    time.advance(Duration::from_nanos(100));
    p.end_store(128);
    p.end_op();
    p.pop_frame();

    p.begin_native(NativeOp::SHA256);
    time.advance(Duration::from_nanos(7));
    p.end_native();
    p.begin_sub_op(SubOp::ASSIGN, SubOpContext::var("x"));
    time.advance(Duration::from_nanos(3));
    p.end_sub_op();
    p.begin_op(Op(0xF0), None);
    p.end_op();

    p.stop().unwrap()
}

fn lines(buf: &[u8]) -> Vec<String> {
    String::from_utf8(buf.to_vec())
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn json_round_trip_through_file() {
    let results = session(ProfilerConfig::default());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");

    results.write_json(File::create(&path).unwrap()).unwrap();
    let loaded = json::read_json(BufReader::new(File::open(&path).unwrap())).unwrap();

    assert_eq!(loaded.start_time, results.start_time);
    assert_eq!(loaded.end_time, results.end_time);
    assert!(loaded.timing_enabled);
    assert_eq!(loaded.op_stats.len(), results.op_stats.len());
    for (name, stat) in &results.op_stats {
        let other = &loaded.op_stats[name];
        assert_eq!(other.timing.count, stat.timing.count);
        assert_eq!(other.timing.total_ns, stat.timing.total_ns);
        assert_eq!(other.gas, stat.gas);
    }
    assert_eq!(loaded.store_stats["StoreGetObject"].total_bytes, 128);
    assert_eq!(
        loaded.location_stats["main.gno:3"].pkg_path,
        results.location_stats["main.gno:3"].pkg_path
    );
    assert_eq!(loaded.var_stats.keys().collect::<Vec<_>>(), vec!["x"]);
    assert_eq!(loaded.stack_samples, results.stack_samples);
}

#[test]
fn json_uses_snapshot_field_names() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    results.write_json(&mut buf).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

    let add = &value["op_stats"]["OpAdd"];
    assert_eq!(add["count"], 2);
    assert_eq!(add["total_ns"], 40);
    assert_eq!(add["gas"], 2 * get_op_gas(Op::ADD));
    assert!(value["start_time"].is_string());
    assert_eq!(value["timing_enabled"], true);
}

#[test]
fn csv_writes_every_section_in_order() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    results.write_csv(&mut buf).unwrap();
    let out = lines(&buf);

    let labels: Vec<_> = out.iter().filter(|l| l.starts_with("# ")).cloned().collect();
    assert_eq!(
        labels,
        CsvSection::ALL
            .iter()
            .map(|s| format!("# {s}"))
            .collect::<Vec<_>>()
    );

    assert_eq!(out[0], "# opcodes");
    assert_eq!(out[1], "name,count,gas,total_ns,avg_ns,min_ns,max_ns,stddev_ns");
    assert_eq!(
        out[2],
        format!("OpAdd,2,{},40,20,10,30,10.00", 2 * get_op_gas(Op::ADD))
    );
    assert!(out[3].starts_with("OpMul,1,"));
    assert!(out[4].starts_with("Unknown,1,"));
    assert_eq!(out[5], "");

    assert!(out.contains(&"StoreGetObject,1,128,128,100,100,100,100,0.00".to_string()));
    assert!(out.contains(&format!(
        "main.gno:3,main,{PKG},2,{},40,20,10,30,10.00",
        2 * get_op_gas(Op::ADD)
    )));
    assert!(out.contains(&"x,1,3,3,3,3,0.00".to_string()));
}

#[test]
fn csv_omits_timing_columns_without_timing() {
    let results = session(ProfilerConfig::default().without_timing());
    let mut buf = Vec::new();
    results.write_csv_section("opcodes", &mut buf).unwrap();
    let out = lines(&buf);

    assert_eq!(out[0], "# opcodes");
    assert_eq!(out[1], "name,count,gas");
    assert_eq!(out[2], format!("OpAdd,2,{}", 2 * get_op_gas(Op::ADD)));
    assert!(out.iter().all(|l| !l.contains("total_ns")));
}

#[test]
fn csv_single_section() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    results.write_csv_section("store", &mut buf).unwrap();
    let out = lines(&buf);
    assert_eq!(out.len(), 3);
    assert_eq!(out[0], "# store");
    assert!(out[2].starts_with("StoreGetObject,"));
}

#[test]
fn csv_rejects_unknown_section() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    let err = results.write_csv_section("bogus", &mut buf).unwrap_err();
    assert!(matches!(err, ProfilerError::UnknownSection(ref s) if s == "bogus"));
    assert!(buf.is_empty());

    // The tag is validated even when there is nothing to write.
    let err = csv::write_csv_section(None, "opcode", Vec::new()).unwrap_err();
    assert!(matches!(err, ProfilerError::UnknownSection(_)));
}

#[test]
fn pprof_samples_follow_call_stacks() {
    let results = session(ProfilerConfig::default());
    let options = PprofOptions::default()
        .with_duration()
        .with_count()
        .with_package_label()
        .with_depth_label();
    let mut buf = Vec::new();
    results.write_pprof(&mut buf, &options).unwrap();
    let profile = proto::Profile::decode(buf.as_slice()).unwrap();

    let strings = &profile.string_table;
    assert_eq!(strings[0], "");
    let types: Vec<_> = profile
        .sample_type
        .iter()
        .map(|t| strings[t.r#type as usize].as_str())
        .collect();
    assert_eq!(types, vec!["gas", "duration", "count"]);
    assert_eq!(strings[profile.sample_type[1].unit as usize], "nanoseconds");

    assert_eq!(profile.sample.len(), 2);
    assert_eq!(profile.location.len(), 2);
    assert_eq!(profile.function.len(), 2);

    let deep = profile
        .sample
        .iter()
        .find(|s| s.location_id.len() == 2)
        .unwrap();
    assert_eq!(
        deep.value,
        vec![2 * get_op_gas(Op::ADD), 40, 2]
    );
    // Leaf first: the opcode's own line, then the caller frame.
    let leaf = &profile.location[(deep.location_id[0] - 1) as usize];
    assert_eq!(leaf.line[0].line, 3);
    let root = &profile.location[(deep.location_id[1] - 1) as usize];
    assert_eq!(root.line[0].line, 1);
    let func = &profile.function[(leaf.line[0].function_id - 1) as usize];
    assert_eq!(strings[func.name as usize], "main");
    assert_eq!(strings[func.filename as usize], "main.gno");

    let labels: Vec<_> = deep
        .label
        .iter()
        .map(|l| strings[l.key as usize].as_str())
        .collect();
    assert_eq!(labels, vec!["package", "depth"]);
    assert_eq!(strings[deep.label[0].str as usize], PKG);
    assert_eq!(deep.label[1].num, 2);

    let shallow = profile
        .sample
        .iter()
        .find(|s| s.location_id.len() == 1)
        .unwrap();
    assert_eq!(shallow.value, vec![get_op_gas(Op::MUL), 5, 1]);
}

#[test]
fn pprof_falls_back_to_locations_without_stacks() {
    let results = session(ProfilerConfig::default().without_call_stacks());
    assert!(results.stack_samples.is_empty());

    let profile = build_profile(&results, &PprofOptions::default());
    assert_eq!(profile.sample_type.len(), 1);
    assert_eq!(profile.sample.len(), 1);
    assert_eq!(profile.sample[0].value, vec![2 * get_op_gas(Op::ADD)]);
    assert!(profile.sample[0].label.is_empty());
}

#[test]
fn pprof_drops_duration_without_timing() {
    let results = session(ProfilerConfig::default().without_timing());
    let profile = build_profile(&results, &PprofOptions::default().with_duration());
    assert_eq!(profile.sample_type.len(), 1);
    assert!(profile.sample.iter().all(|s| s.value.len() == 1));
}

#[test]
fn report_lists_sections() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    results
        .write_report(&mut buf, &ReportOptions::default())
        .unwrap();
    let text = String::from_utf8(buf).unwrap();

    assert!(text.starts_with("Profile report\n"));
    for title in ["Opcodes", "Store", "Native", "Sub-ops", "Locations", "Variables"] {
        assert!(text.lines().any(|l| l == title), "missing {title}");
    }
    assert!(text.contains("OpAdd"));
    assert!(text.contains("StoreGetObject"));
    assert!(text.contains("stddev"));
    assert!(text.contains("40ns"));

    // Most expensive first.
    let add = text.find("OpAdd").unwrap();
    let mul = text.find("OpMul").unwrap();
    assert!(add < mul);
}

#[test]
fn report_top_n_truncates_sections() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    report::write_report(Some(&results), &mut buf, &ReportOptions::top(1)).unwrap();
    let text = String::from_utf8(buf).unwrap();

    assert!(text.contains("Opcodes (top 1 of 3)"));
    assert!(text.contains("OpAdd"));
    assert!(!text.contains("OpMul"));
    assert!(!text.contains("Unknown"));
}

#[test]
fn report_without_timing() {
    let results = session(ProfilerConfig::default().without_timing());
    let mut buf = Vec::new();
    results
        .write_report(&mut buf, &ReportOptions::default())
        .unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("(timing disabled)"));
    assert!(!text.contains("stddev"));
}

#[test]
fn legacy_records_round_trip() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    results.write_legacy(&mut buf).unwrap();
    assert_eq!(buf.len() % RECORD_SIZE, 0);

    let records = legacy::read_legacy(buf.as_slice()).unwrap();
    // OpAdd, OpMul, one store, one native, one sub-op; the unknown opcode has no code.
    assert_eq!(records.len(), 5);

    let add = records
        .iter()
        .find(|r| r.kind == RecordKind::Op && r.code == Op::ADD.code())
        .unwrap();
    assert_eq!(add.count, 2);
    assert_eq!(add.total_ns, 40);
    assert_eq!(add.extra as i64, 2 * get_op_gas(Op::ADD));

    let store = records
        .iter()
        .find(|r| r.kind == RecordKind::Store)
        .unwrap();
    assert_eq!(store.code, StoreOp::GET_OBJECT.code());
    assert_eq!(store.extra, 128);
}

#[test]
fn legacy_overflow_writes_nothing() {
    let mut results = session(ProfilerConfig::default());
    results
        .op_stats
        .get_mut("OpMul")
        .unwrap()
        .timing
        .total_ns = u64::from(u32::MAX) + 1;

    let mut buf = Vec::new();
    let err = results.write_legacy(&mut buf).unwrap_err();
    match err {
        ProfilerError::RecordOverflow {
            name, field, width, ..
        } => {
            assert_eq!(name, "OpMul");
            assert_eq!(field, "total_ns");
            assert_eq!(width, 32);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(buf.is_empty());
}

#[test]
fn legacy_rejects_truncated_stream() {
    let results = session(ProfilerConfig::default());
    let mut buf = Vec::new();
    results.write_legacy(&mut buf).unwrap();
    buf.truncate(buf.len() - 3);
    assert!(matches!(
        legacy::read_legacy(buf.as_slice()),
        Err(ProfilerError::Io(_))
    ));
}

#[test]
fn missing_results_export_nothing() {
    let mut out = Vec::new();
    json::write_json(None, &mut out).unwrap();
    csv::write_csv(None, &mut out).unwrap();
    csv::write_csv_section(None, "opcodes", &mut out).unwrap();
    write_pprof(None, &mut out, &PprofOptions::default()).unwrap();
    report::write_report(None, &mut out, &ReportOptions::default()).unwrap();
    legacy::write_legacy(None, &mut out).unwrap();
    assert!(out.is_empty());
}
