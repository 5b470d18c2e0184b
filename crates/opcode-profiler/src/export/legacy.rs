// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-width binary records for older stats tooling.
//!
//! One 14-byte little-endian record per code with samples:
//!
//! | offset | width | field                                           |
//! |--------|-------|-------------------------------------------------|
//! | 0      | 1     | kind: 1 opcode, 2 store, 3 native, 4 sub-op     |
//! | 1      | 1     | code byte                                       |
//! | 2      | 4     | count                                           |
//! | 6      | 4     | total nanoseconds                               |
//! | 10     | 4     | extra: gas for opcodes, bytes for store, else 0 |
//!
//! Records are keyed by code, not name, so only names that resolve back to a code through the
//! name tables are written; `Unknown` entries have no code to write and are skipped.

use crate::error::{ProfilerError, ProfilerResult};
use crate::metrics::TimingStat;
use crate::ops::{NativeOp, Op, StoreOp, SubOp};
use crate::results::Results;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::debug;

pub const RECORD_SIZE: usize = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    Op = 1,
    Store = 2,
    Native = 3,
    SubOp = 4,
}

impl TryFrom<u8> for RecordKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RecordKind::Op),
            2 => Ok(RecordKind::Store),
            3 => Ok(RecordKind::Native),
            4 => Ok(RecordKind::SubOp),
            other => Err(other),
        }
    }
}

/// A decoded record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyRecord {
    pub kind: RecordKind,
    pub code: u8,
    pub count: u32,
    pub total_ns: u32,
    pub extra: u32,
}

fn name_to_code(names: impl Fn(u8) -> &'static str) -> HashMap<&'static str, u8> {
    (0..=u8::MAX)
        .map(|code| (names(code), code))
        .filter(|(name, _)| *name != crate::ops::UNKNOWN)
        .collect()
}

fn fit(name: &str, field: &'static str, value: u64) -> ProfilerResult<u32> {
    u32::try_from(value).map_err(|_| ProfilerError::RecordOverflow {
        name: name.to_string(),
        field,
        value,
        width: 32,
    })
}

fn encode(
    name: &str,
    kind: RecordKind,
    code: u8,
    timing: &TimingStat,
    extra: u64,
) -> ProfilerResult<LegacyRecord> {
    Ok(LegacyRecord {
        kind,
        code,
        count: fit(name, "count", timing.count)?,
        total_ns: fit(name, "total_ns", timing.total_ns)?,
        extra: fit(name, "extra", extra)?,
    })
}

/// Encode every record before writing anything, so an overflow never leaves a partial file.
pub fn records(results: &Results) -> ProfilerResult<Vec<LegacyRecord>> {
    let mut records = Vec::new();

    let codes = name_to_code(|c| Op(c).name());
    for (name, stat) in &results.op_stats {
        if let Some(code) = codes.get(name.as_str()) {
            let gas = u64::try_from(stat.gas).unwrap_or(u64::MAX);
            records.push(encode(name, RecordKind::Op, *code, &stat.timing, gas)?);
        }
    }
    let codes = name_to_code(|c| StoreOp(c).name());
    for (name, stat) in &results.store_stats {
        if let Some(code) = codes.get(name.as_str()) {
            records.push(encode(
                name,
                RecordKind::Store,
                *code,
                &stat.timing,
                stat.total_bytes,
            )?);
        }
    }
    let codes = name_to_code(|c| NativeOp(c).name());
    for (name, stat) in &results.native_stats {
        if let Some(code) = codes.get(name.as_str()) {
            records.push(encode(name, RecordKind::Native, *code, &stat.timing, 0)?);
        }
    }
    let codes = name_to_code(|c| SubOp(c).name());
    for (name, stat) in &results.sub_op_stats {
        if let Some(code) = codes.get(name.as_str()) {
            records.push(encode(name, RecordKind::SubOp, *code, &stat.timing, 0)?);
        }
    }
    Ok(records)
}

pub fn write_legacy<W: Write>(results: Option<&Results>, mut w: W) -> ProfilerResult<()> {
    let Some(results) = results else {
        return Ok(());
    };
    let records = records(results)?;
    for record in &records {
        w.write_u8(record.kind as u8)?;
        w.write_u8(record.code)?;
        w.write_u32::<LittleEndian>(record.count)?;
        w.write_u32::<LittleEndian>(record.total_ns)?;
        w.write_u32::<LittleEndian>(record.extra)?;
    }
    w.flush()?;
    debug!(records = records.len(), "wrote legacy binary profile");
    Ok(())
}

/// Decode a stream of records. A trailing partial record is an `UnexpectedEof` error.
pub fn read_legacy<R: Read>(mut r: R) -> ProfilerResult<Vec<LegacyRecord>> {
    let mut records = Vec::new();
    loop {
        let kind = match r.read_u8() {
            Ok(kind) => kind,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        let kind = RecordKind::try_from(kind).map_err(|k| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown record kind {k}"),
            )
        })?;
        records.push(LegacyRecord {
            kind,
            code: r.read_u8()?,
            count: r.read_u32::<LittleEndian>()?,
            total_ns: r.read_u32::<LittleEndian>()?,
            extra: r.read_u32::<LittleEndian>()?,
        });
    }
    Ok(records)
}
