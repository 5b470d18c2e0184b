// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::ProfilerResult;
use crate::metrics::TimingStat;
use crate::results::Results;
use std::cmp::Reverse;
use std::io::Write;
use tabled::builder::Builder as TableBuilder;
use tabled::settings::{object::Columns, Alignment, Modify, Style as TableStyle};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Keep only the N most expensive rows of each section. `None` keeps everything.
    pub top_n: Option<usize>,
}

impl ReportOptions {
    pub fn top(n: usize) -> Self {
        Self { top_n: Some(n) }
    }
}

fn format_ns(ns: u64) -> String {
    match ns {
        0..=999 => format!("{ns}ns"),
        1_000..=999_999 => format!("{:.2}µs", ns as f64 / 1e3),
        1_000_000..=999_999_999 => format!("{:.2}ms", ns as f64 / 1e6),
        _ => format!("{:.2}s", ns as f64 / 1e9),
    }
}

struct Row<'a> {
    name: &'a str,
    timing: &'a TimingStat,
    extra: Vec<String>,
}

fn write_section<W: Write>(
    w: &mut W,
    title: &str,
    extra_columns: &[&str],
    mut rows: Vec<Row<'_>>,
    timing_enabled: bool,
    options: &ReportOptions,
) -> ProfilerResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let total_rows = rows.len();
    rows.sort_by_key(|r| (Reverse(r.timing.total_ns), Reverse(r.timing.count), r.name));
    if let Some(n) = options.top_n {
        rows.truncate(n);
    }

    if rows.len() < total_rows {
        writeln!(w, "{title} (top {} of {total_rows})", rows.len())?;
    } else {
        writeln!(w, "{title}")?;
    }

    let mut builder = TableBuilder::default();
    let mut header = vec!["name".to_string(), "count".to_string()];
    header.extend(extra_columns.iter().map(|c| c.to_string()));
    if timing_enabled {
        header.extend(["total", "avg", "min", "max", "stddev"].map(String::from));
    }
    builder.push_record(header);

    for row in rows {
        let mut record = vec![row.name.to_string(), row.timing.count.to_string()];
        record.extend(row.extra);
        if timing_enabled {
            record.push(format_ns(row.timing.total_ns));
            record.push(format_ns(row.timing.avg_ns()));
            record.push(format_ns(row.timing.min_ns));
            record.push(format_ns(row.timing.max_ns));
            record.push(format_ns(row.timing.std_dev_ns() as u64));
        }
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(TableStyle::blank());
    table.with(Modify::new(Columns::new(1..)).with(Alignment::right()));
    writeln!(w, "{table}")?;
    writeln!(w)?;
    Ok(())
}

/// Column-aligned text report, one table per non-empty section, most expensive rows first.
pub fn write_report<W: Write>(
    results: Option<&Results>,
    mut w: W,
    options: &ReportOptions,
) -> ProfilerResult<()> {
    let Some(results) = results else {
        return Ok(());
    };
    let timed = results.timing_enabled;
    let session_ns = results
        .duration()
        .num_nanoseconds()
        .unwrap_or(0)
        .max(0) as u64;

    writeln!(w, "Profile report")?;
    writeln!(w, "Duration: {}", format_ns(session_ns))?;
    writeln!(w, "Start:    {}", results.start_time.to_rfc3339())?;
    writeln!(w, "End:      {}", results.end_time.to_rfc3339())?;
    writeln!(
        w,
        "Totals:   {} ops, {} gas{}",
        results.total_op_count(),
        results.total_gas(),
        if timed { "" } else { " (timing disabled)" }
    )?;
    writeln!(w)?;

    let ops = results
        .op_stats
        .iter()
        .map(|(name, s)| Row {
            name: name.as_str(),
            timing: &s.timing,
            extra: vec![s.gas.to_string()],
        })
        .collect();
    write_section(&mut w, "Opcodes", &["gas"], ops, timed, options)?;

    let store = results
        .store_stats
        .iter()
        .map(|(name, s)| Row {
            name: name.as_str(),
            timing: &s.timing,
            extra: vec![s.total_bytes.to_string(), s.avg_bytes().to_string()],
        })
        .collect();
    write_section(&mut w, "Store", &["bytes", "avg bytes"], store, timed, options)?;

    let native = results
        .native_stats
        .iter()
        .map(|(name, s)| Row {
            name: name.as_str(),
            timing: &s.timing,
            extra: vec![],
        })
        .collect();
    write_section(&mut w, "Native", &[], native, timed, options)?;

    let sub_ops = results
        .sub_op_stats
        .iter()
        .map(|(name, s)| Row {
            name: name.as_str(),
            timing: &s.timing,
            extra: vec![],
        })
        .collect();
    write_section(&mut w, "Sub-ops", &[], sub_ops, timed, options)?;

    let locations = results
        .location_stats
        .iter()
        .map(|(key, s)| Row {
            name: key.as_str(),
            timing: &s.timing,
            extra: vec![s.func.clone(), s.gas.to_string()],
        })
        .collect();
    write_section(&mut w, "Locations", &["func", "gas"], locations, timed, options)?;

    let vars = results
        .var_stats
        .iter()
        .map(|(name, s)| Row {
            name: name.as_str(),
            timing: &s.timing,
            extra: vec![],
        })
        .collect();
    write_section(&mut w, "Variables", &[], vars, timed, options)?;

    w.flush()?;
    Ok(())
}
