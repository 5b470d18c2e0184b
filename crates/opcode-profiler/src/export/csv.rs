// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! One CSV table per section, each preceded by a `# <section>` label line and separated by a
//! blank line. Rows are sorted by name. Timing columns are present only when the session was
//! recorded with timing enabled.

use crate::error::{ProfilerError, ProfilerResult};
use crate::metrics::TimingStat;
use crate::results::Results;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::debug;

const TIMING_COLUMNS: [&str; 5] = ["total_ns", "avg_ns", "min_ns", "max_ns", "stddev_ns"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CsvSection {
    Opcodes,
    Store,
    Native,
    Locations,
    SubOps,
    Vars,
}

impl CsvSection {
    pub const ALL: [CsvSection; 6] = [
        CsvSection::Opcodes,
        CsvSection::Store,
        CsvSection::Native,
        CsvSection::Locations,
        CsvSection::SubOps,
        CsvSection::Vars,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            CsvSection::Opcodes => "opcodes",
            CsvSection::Store => "store",
            CsvSection::Native => "native",
            CsvSection::Locations => "locations",
            CsvSection::SubOps => "sub_ops",
            CsvSection::Vars => "vars",
        }
    }

    fn leading_columns(self) -> &'static [&'static str] {
        match self {
            CsvSection::Opcodes => &["name", "count", "gas"],
            CsvSection::Store => &["name", "count", "total_bytes", "avg_bytes"],
            CsvSection::Native | CsvSection::SubOps | CsvSection::Vars => &["name", "count"],
            CsvSection::Locations => &["location", "func", "pkg", "count", "gas"],
        }
    }

    /// Column names in output order.
    pub fn header(self, timing_enabled: bool) -> Vec<&'static str> {
        let mut header = self.leading_columns().to_vec();
        if timing_enabled {
            header.extend(TIMING_COLUMNS);
        }
        header
    }
}

impl fmt::Display for CsvSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for CsvSection {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CsvSection::ALL
            .into_iter()
            .find(|section| section.tag() == s)
            .ok_or_else(|| ProfilerError::UnknownSection(s.to_string()))
    }
}

fn timing_cells(timing: &TimingStat) -> [String; 5] {
    [
        timing.total_ns.to_string(),
        timing.avg_ns().to_string(),
        timing.min_ns.to_string(),
        timing.max_ns.to_string(),
        format!("{:.2}", timing.std_dev_ns()),
    ]
}

fn row(mut leading: Vec<String>, timing: &TimingStat, timing_enabled: bool) -> Vec<String> {
    if timing_enabled {
        leading.extend(timing_cells(timing));
    }
    leading
}

fn rows(results: &Results, section: CsvSection) -> Vec<Vec<String>> {
    let timed = results.timing_enabled;
    match section {
        CsvSection::Opcodes => results
            .op_stats
            .iter()
            .map(|(name, s)| {
                let leading = vec![
                    name.clone(),
                    s.timing.count.to_string(),
                    s.gas.to_string(),
                ];
                row(leading, &s.timing, timed)
            })
            .collect(),
        CsvSection::Store => results
            .store_stats
            .iter()
            .map(|(name, s)| {
                let leading = vec![
                    name.clone(),
                    s.timing.count.to_string(),
                    s.total_bytes.to_string(),
                    s.avg_bytes().to_string(),
                ];
                row(leading, &s.timing, timed)
            })
            .collect(),
        CsvSection::Native => results
            .native_stats
            .iter()
            .map(|(name, s)| row(vec![name.clone(), s.timing.count.to_string()], &s.timing, timed))
            .collect(),
        CsvSection::Locations => results
            .location_stats
            .iter()
            .map(|(key, s)| {
                let leading = vec![
                    key.clone(),
                    s.func.clone(),
                    s.pkg_path.clone(),
                    s.timing.count.to_string(),
                    s.gas.to_string(),
                ];
                row(leading, &s.timing, timed)
            })
            .collect(),
        CsvSection::SubOps => results
            .sub_op_stats
            .iter()
            .map(|(name, s)| row(vec![name.clone(), s.timing.count.to_string()], &s.timing, timed))
            .collect(),
        CsvSection::Vars => results
            .var_stats
            .iter()
            .map(|(name, s)| row(vec![name.clone(), s.timing.count.to_string()], &s.timing, timed))
            .collect(),
    }
}

fn write_table<W: Write>(results: &Results, section: CsvSection, w: &mut W) -> ProfilerResult<()> {
    writeln!(w, "# {section}")?;
    let mut writer = ::csv::Writer::from_writer(&mut *w);
    writer.write_record(section.header(results.timing_enabled))?;
    for record in rows(results, section) {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Every section, in a fixed order.
pub fn write_csv<W: Write>(results: Option<&Results>, mut w: W) -> ProfilerResult<()> {
    let Some(results) = results else {
        return Ok(());
    };
    for (i, section) in CsvSection::ALL.into_iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        write_table(results, section, &mut w)?;
    }
    w.flush()?;
    debug!(timing = results.timing_enabled, "wrote CSV profile");
    Ok(())
}

/// Exactly one section, selected by its tag (`opcodes`, `store`, `native`, `locations`,
/// `sub_ops` or `vars`).
pub fn write_csv_section<W: Write>(
    results: Option<&Results>,
    section: &str,
    mut w: W,
) -> ProfilerResult<()> {
    let section: CsvSection = section.parse()?;
    let Some(results) = results else {
        return Ok(());
    };
    write_table(results, section, &mut w)?;
    w.flush()?;
    Ok(())
}
